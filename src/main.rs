fn main() {
    if let Err(e) = labscan_lib::run() {
        eprintln!("labscan-server: {e}");
        std::process::exit(1);
    }
}
