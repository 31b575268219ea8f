use std::net::UdpSocket;
use std::os::unix::io::AsRawFd;
use std::process::ExitCode;

use clap::Parser;

use dhcpd::arp::LinuxArpTable;
use dhcpd::cli::{self, Args};
use dhcpd::dispatch::Dispatcher;

const BOOTPS_PORT: u16 = 67;

fn main() -> ExitCode {
    let args = Args::parse();

    env_logger::Builder::new()
        .filter_level(match args.verbose {
            0 => log::LevelFilter::Info,
            1 => log::LevelFilter::Debug,
            _ => log::LevelFilter::Trace,
        })
        .init();

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("dhcpd: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> dhcpd::Result<()> {
    let pool = cli::build_pool(args)?;

    let socket = UdpSocket::bind(("0.0.0.0", BOOTPS_PORT))?;
    let arp = LinuxArpTable::new(socket.as_raw_fd(), &pool.device)?;

    log::info!(
        "listening on {}:{BOOTPS_PORT}, device {}, pool {} live bindings",
        socket.local_addr()?,
        pool.device,
        pool.bindings.len(),
    );

    let mut dispatcher = Dispatcher::new(socket, pool, arp);
    dispatcher.run();
}
