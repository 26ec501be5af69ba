mod cli;

fn main() {
    env_logger::init();

    if let Err(err) = cli::dispatch() {
        eprintln!("\u{001b}[31merror:\u{001b}[0m {err:?}");
        std::process::exit(1);
    }
}
