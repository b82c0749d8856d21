fn main() {
    if let Err(err) = webinar_lib::run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
