fn main() {
    if let Err(e) = insightdeck_lib::run() {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}
