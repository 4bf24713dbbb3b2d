//! `bears-recv` — listens for BEARS-TP transfers and writes each one to
//! `out_<basename>`.

use std::fs::File;
use std::io;
use std::net::SocketAddr;
use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use log::error;

use proto::receiver::{self, ConnectionTable, SinkFactory};
use proto::transport::UdpTransport;
use proto::DEFAULT_PORT;
use util::FatalError;

#[derive(Parser, Debug)]
#[command(name = "bears-recv", about = "Receive files over BEARS-TP")]
struct Args {
	/// Listen port.
	#[arg(short = 'p', long = "port", default_value_t = DEFAULT_PORT)]
	port: u16,

	/// Idle-connection timeout in seconds.
	#[arg(short = 't', long = "timeout", default_value_t = 10)]
	timeout: u64,

	/// Enable debug-level logging.
	#[arg(short = 'd', long = "debug")]
	debug: bool,
}

/// Opens `out_<basename>` on disk for each newly started transfer.
struct FileSinkFactory;

impl SinkFactory for FileSinkFactory {
	type Sink = File;

	fn open(&mut self, basename: &[u8]) -> io::Result<Self::Sink> {
		let name = format!("out_{}", String::from_utf8_lossy(basename));
		File::create(name)
	}
}

fn main() -> ExitCode {
	let args = Args::parse();
	runtime::init_logging(args.debug);

	match run(args) {
		Ok(()) => ExitCode::SUCCESS,
		Err(e) => {
			error!("{e}");
			ExitCode::FAILURE
		}
	}
}

fn run(args: Args) -> Result<(), FatalError> {
	let shutdown = runtime::install_shutdown_signal().map_err(FatalError::Signal)?;

	let addr: SocketAddr = (std::net::Ipv4Addr::UNSPECIFIED, args.port).into();
	let socket = std::net::UdpSocket::bind(addr).map_err(|source| FatalError::Bind { addr: addr.to_string(), source })?;
	let mut transport = UdpTransport::from_socket(socket);

	let timeout = Duration::from_secs(args.timeout);
	let mut table = ConnectionTable::new(FileSinkFactory, timeout);

	receiver::run(&mut transport, &mut table, || shutdown.requested()).map_err(FatalError::Io)
}
