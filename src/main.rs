fn main() {
    if let Err(err) = statement_tables::run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
