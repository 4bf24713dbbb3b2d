//! `bears-send` — sends one file (or stdin) to a `bears-recv` peer over
//! BEARS-TP.

use std::fs::File;
use std::io::{self, Cursor, Read, Seek};
use std::net::{SocketAddr, ToSocketAddrs, UdpSocket};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use log::{error, info};
use rand::Rng;

use proto::chunker::Chunker;
use proto::sender::{SenderConfig, SenderSession};
use proto::transport::UdpTransport;
use proto::DEFAULT_PORT;
use util::FatalError;

#[derive(Parser, Debug)]
#[command(name = "bears-send", about = "Send a file over BEARS-TP")]
struct Args {
	/// File to send; reads stdin if omitted.
	#[arg(short = 'f', long = "file")]
	file: Option<PathBuf>,

	/// Destination host.
	#[arg(short = 'a', long = "address", default_value = "localhost")]
	address: String,

	/// Destination port.
	#[arg(short = 'p', long = "port", default_value_t = DEFAULT_PORT)]
	port: u16,

	/// Enable debug-level logging.
	#[arg(short = 'd', long = "debug")]
	debug: bool,
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

	let peer = resolve(&args.address, args.port)?;
	let socket = UdpSocket::bind(("0.0.0.0", 0)).map_err(|source| FatalError::Bind { addr: "0.0.0.0:0".into(), source })?;
	let mut transport = UdpTransport::from_socket(socket);

	let initial_seqno: u32 = rand::thread_rng().gen();
	let config = SenderConfig::default();

	match args.file {
		Some(path) => {
			let file = File::open(&path).map_err(|source| FatalError::OpenFile { path: path.clone(), source })?;
			let basename = path
				.file_name()
				.map(|n| n.to_string_lossy().into_owned())
				.unwrap_or_else(|| "file".to_string());
			info!("sending {} to {peer}", basename);
			send(file, basename.into_bytes(), initial_seqno, peer, config, &mut transport, &shutdown)
		}
		None => {
			let mut buf = Vec::new();
			io::stdin().read_to_end(&mut buf).map_err(FatalError::Io)?;
			info!("sending stdin ({} bytes) to {peer}", buf.len());
			send(Cursor::new(buf), b"stdin".to_vec(), initial_seqno, peer, config, &mut transport, &shutdown)
		}
	}
}

fn send<R: Read + Seek>(
	source: R,
	basename: Vec<u8>,
	initial_seqno: u32,
	peer: SocketAddr,
	config: SenderConfig,
	transport: &mut UdpTransport,
	shutdown: &runtime::ShutdownFlag,
) -> Result<(), FatalError> {
	let chunker = Chunker::new(source, basename, initial_seqno);
	let mut session = SenderSession::new(chunker, peer, config);

	session.run(transport, || shutdown.requested()).map_err(FatalError::Io)?;

	info!("transfer finished in state {:?}", session.state());
	Ok(())
}

fn resolve(address: &str, port: u16) -> Result<SocketAddr, FatalError> {
	(address, port)
		.to_socket_addrs()
		.map_err(FatalError::Io)?
		.next()
		.ok_or_else(|| FatalError::Io(io::Error::new(io::ErrorKind::NotFound, format!("could not resolve {address}"))))
}
