fn main() {
    if let Err(err) = lode_cli::run_cli() {
        lode_logger::error(&format!("{err}"));
        std::process::exit(1);
    }
}
