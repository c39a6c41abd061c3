fn main() {
    if let Err(err) = focus_guardian_lib::run() {
        eprintln!("focus-guardian: {err:#}");
        std::process::exit(1);
    }
}
