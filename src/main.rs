fn main() {
    if let Err(err) = motionstat_lib::run() {
        eprintln!("motionstat: {err:#}");
        std::process::exit(1);
    }
}
