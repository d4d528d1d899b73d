fn main() {
    if let Err(err) = chanlist::cli::run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
