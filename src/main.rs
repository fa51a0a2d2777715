use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use clap::{Arg, ArgAction, Command};
use tokio::net::TcpListener;

use meshsync::config::Config;
use meshsync::handlers::delete::delete_local_and_broadcast;
use meshsync::identity::{load_or_create_id, local_ipv4};
use meshsync::logging::init_tracing;
use meshsync::node::{Node, NodeContext};
use meshsync::oplog::OperationLog;
use meshsync::protocol::{dial_and_exchange, dial_and_send, Message, MessageType};
use meshsync::reconcile::sync_with_peer;
use meshsync::state::SharedState;
use meshsync::tree::flatten_tree;
use meshsync::types::PeerEndpoint;

const CLI_IDENTITY: &str = "cli";
const OPERATIONS_LOG: &str = "operations.log";

fn parse_peer(spec: &str) -> Result<PeerEndpoint, String> {
	let (id_part, addr_part) = spec.split_once('@').ok_or_else(|| format!("peer must be id@ip:port, got {}", spec))?;
	let id = id_part.parse().map_err(|_| format!("invalid peer id: {}", id_part))?;
	let (ip, port) = addr_part.split_once(':').ok_or_else(|| format!("peer address must be ip:port, got {}", addr_part))?;
	Ok(PeerEndpoint { id, ip: ip.to_string(), port: port.to_string() })
}

fn build_config(matches: &clap::ArgMatches) -> Result<Config, Box<dyn std::error::Error>> {
	let config_path = matches.get_one::<String>("config").map(PathBuf::from).unwrap_or_else(|| PathBuf::from("meshsync.toml"));
	let mut cfg = Config::default().merge_file(&config_path)?.merge_env();

	if let Some(port) = matches.get_one::<String>("port") {
		cfg.port = port.parse()?;
	}
	if let Some(dir) = matches.get_one::<String>("shared-dir") {
		cfg.shared_dir = PathBuf::from(dir);
	}
	if let Some(file) = matches.get_one::<String>("state-file") {
		cfg.state_file = PathBuf::from(file);
	}
	if let Some(secs) = matches.get_one::<String>("retry-interval") {
		cfg.retry_interval_secs = secs.parse()?;
	}
	if let Some(secs) = matches.get_one::<String>("monitor-interval") {
		cfg.monitor_interval_secs = secs.parse()?;
	}
	if let Some(specs) = matches.get_many::<String>("peer") {
		cfg.peers = specs.map(|s| parse_peer(s)).collect::<Result<Vec<_>, _>>()?;
	}

	Ok(cfg)
}

/// Build the context a `serve`d node or a locally-originated `delete`
/// both need: identity, shared directory, persistent state, and the
/// operation log.
fn build_context(cfg: &Config) -> Result<NodeContext, Box<dyn std::error::Error>> {
	let id_path = cfg.state_file.parent().unwrap_or_else(|| Path::new(".")).join("peer.id");
	let id = load_or_create_id(&id_path)?;
	let self_addr = format!("{}:{}", local_ipv4(), cfg.port);
	let state = SharedState::load(&cfg.state_file)?;
	let oplog = OperationLog::new(OPERATIONS_LOG);

	Ok(NodeContext { id, self_addr, shared_dir: cfg.shared_dir.clone(), state, oplog, peers: cfg.peers.clone() })
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
	init_tracing();

	let matches = Command::new("meshsync")
		.version(env!("CARGO_PKG_VERSION"))
		.about("Peer-to-peer file-sharing mesh node")
		.subcommand_required(true)
		.subcommand(
			Command::new("serve")
				.about("Run the node runtime in the foreground")
				.arg(Arg::new("config").long("config").value_name("FILE"))
				.arg(Arg::new("port").long("port").value_name("PORT"))
				.arg(Arg::new("shared-dir").long("shared-dir").value_name("DIR"))
				.arg(Arg::new("state-file").long("state-file").value_name("FILE"))
				.arg(Arg::new("retry-interval").long("retry-interval").value_name("SECS"))
				.arg(Arg::new("monitor-interval").long("monitor-interval").value_name("SECS"))
				.arg(Arg::new("peer").long("peer").value_name("ID@IP:PORT").action(ArgAction::Append)),
		)
		.subcommand(
			Command::new("list")
				.about("List a peer's shared directory")
				.arg(Arg::new("peer").long("peer").required(true).value_name("IP:PORT")),
		)
		.subcommand(
			Command::new("push")
				.about("Push a local file or directory to a peer")
				.arg(Arg::new("file").required(true))
				.arg(Arg::new("peer").long("peer").required(true).value_name("IP:PORT")),
		)
		.subcommand(
			Command::new("fetch")
				.about("Fetch a file from a peer into the shared directory")
				.arg(Arg::new("name").required(true))
				.arg(Arg::new("peer").long("peer").required(true).value_name("IP:PORT"))
				.arg(Arg::new("shared-dir").long("shared-dir").value_name("DIR")),
		)
		.subcommand(
			Command::new("delete")
				.about("Delete a file locally and broadcast the deletion to every configured peer")
				.arg(Arg::new("file").required(true))
				.arg(Arg::new("config").long("config").value_name("FILE"))
				.arg(Arg::new("shared-dir").long("shared-dir").value_name("DIR")),
		)
		.subcommand(
			Command::new("sync")
				.about("Run one reconciliation pass against a peer and report what was pulled")
				.arg(Arg::new("peer").long("peer").required(true).value_name("ID@IP:PORT"))
				.arg(Arg::new("config").long("config").value_name("FILE"))
				.arg(Arg::new("shared-dir").long("shared-dir").value_name("DIR"))
				.arg(Arg::new("state-file").long("state-file").value_name("FILE")),
		)
		.get_matches();

	match matches.subcommand() {
		Some(("serve", sub)) => run_serve(sub).await,
		Some(("list", sub)) => run_list(sub).await,
		Some(("push", sub)) => run_push(sub).await,
		Some(("fetch", sub)) => run_fetch(sub).await,
		Some(("delete", sub)) => run_delete(sub).await,
		Some(("sync", sub)) => run_sync(sub).await,
		_ => unreachable!("clap enforces subcommand_required"),
	}
}

async fn run_serve(matches: &clap::ArgMatches) -> Result<(), Box<dyn std::error::Error>> {
	let cfg = build_config(matches)?;
	let ctx = build_context(&cfg)?;

	tracing::info!(port = cfg.port, self_addr = %ctx.self_addr, peers = cfg.peers.len(), "starting node");

	let listener = TcpListener::bind(("0.0.0.0", cfg.port)).await?;
	let node = Node::new(ctx, Duration::from_secs(cfg.retry_interval_secs), Duration::from_secs(cfg.monitor_interval_secs));
	node.run(listener).await?;
	Ok(())
}

async fn run_list(matches: &clap::ArgMatches) -> Result<(), Box<dyn std::error::Error>> {
	let peer = matches.get_one::<String>("peer").unwrap();
	let reply = dial_and_exchange(peer, &Message::list_request(CLI_IDENTITY)).await?;
	let tree = reply.file_tree.ok_or("peer returned no file tree")?;
	for entry in flatten_tree(&tree) {
		println!("{}\t{}", entry.mod_time, entry.name);
	}
	Ok(())
}

async fn run_push(matches: &clap::ArgMatches) -> Result<(), Box<dyn std::error::Error>> {
	let file = matches.get_one::<String>("file").unwrap();
	let peer = matches.get_one::<String>("peer").unwrap();
	let path = Path::new(file);

	let metadata = tokio::fs::metadata(path).await?;
	if metadata.is_dir() {
		return Err("push of a directory is only supported via a running node's SendFile path (zip archival); push a file instead".into());
	}

	let data = tokio::fs::read(path).await?;
	let mod_time = meshsync::time::mod_time_secs(&metadata);
	let file_name = path.file_name().ok_or("file has no name")?.to_string_lossy().into_owned();

	dial_and_send(peer, &Message::transfer(CLI_IDENTITY, file_name, data, mod_time)).await?;
	println!("pushed {} to {}", file, peer);
	Ok(())
}

async fn run_fetch(matches: &clap::ArgMatches) -> Result<(), Box<dyn std::error::Error>> {
	let name = matches.get_one::<String>("name").unwrap();
	let peer = matches.get_one::<String>("peer").unwrap();
	let shared_dir = matches.get_one::<String>("shared-dir").map(PathBuf::from).unwrap_or_else(|| PathBuf::from("shared"));

	let reply = dial_and_exchange(peer, &Message::request_file(CLI_IDENTITY, name.clone())).await?;
	if reply.kind != MessageType::Transfer {
		let reason = reply.data.map(|d| String::from_utf8_lossy(&d).into_owned()).unwrap_or_default();
		return Err(format!("fetch failed: {}", reason).into());
	}

	let data = reply.data.unwrap_or_default();
	let dest = shared_dir.join(format!("recibido-{}", meshsync::validation::base_name(name)));
	if let Some(parent) = dest.parent() {
		tokio::fs::create_dir_all(parent).await?;
	}
	tokio::fs::write(&dest, &data).await?;
	println!("fetched {} -> {}", name, dest.display());
	Ok(())
}

async fn run_delete(matches: &clap::ArgMatches) -> Result<(), Box<dyn std::error::Error>> {
	let file = matches.get_one::<String>("file").unwrap();
	let mut cfg = build_config(matches)?;
	if let Some(dir) = matches.get_one::<String>("shared-dir") {
		cfg.shared_dir = PathBuf::from(dir);
	}
	let ctx = Arc::new(build_context(&cfg)?);
	delete_local_and_broadcast(&ctx, file).await?;
	println!("deleted {} and broadcast to {} peer(s)", file, ctx.other_peers().count());
	Ok(())
}

/// One-shot client command: run the same reconciliation PeerMonitor
/// triggers automatically on a detected reconnection, but on demand.
async fn run_sync(matches: &clap::ArgMatches) -> Result<(), Box<dyn std::error::Error>> {
	let peer_spec = matches.get_one::<String>("peer").unwrap();
	let peer = parse_peer(peer_spec)?;

	let mut cfg = build_config(matches)?;
	if let Some(dir) = matches.get_one::<String>("shared-dir") {
		cfg.shared_dir = PathBuf::from(dir);
	}
	if let Some(file) = matches.get_one::<String>("state-file") {
		cfg.state_file = PathBuf::from(file);
	}

	let ctx = Arc::new(build_context(&cfg)?);
	let result = sync_with_peer(ctx, peer).await?;

	println!("pulled {} file(s), skipped {} conflict(s), {} error(s)", result.pulled.len(), result.skipped, result.errors);
	for name in &result.pulled {
		println!("  + {}", name);
	}
	Ok(())
}

// vim: ts=4
