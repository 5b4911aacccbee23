fn main() {
    if let Err(e) = data_connection::cli::run() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
