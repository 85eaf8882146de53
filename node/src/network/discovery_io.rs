//! UDP event loop driving the `discovery` crate's routing table: binds
//! one socket, seeds the table from the configured bootnodes, and
//! forwards every inbound datagram through `discovery::handle_packet`,
//! sending back whatever it decides to reply with.

use crate::config::BootNode;
use crate::error::NodeError;
use discovery::{
    build_find_neighbours, build_ping, handle_packet, is_expired, parse_packet, Action, Endpoint,
    FindNeighbours, NodeId, Packet, Ping, RoutingTable,
};
use std::net::SocketAddr;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};
use tokio::net::UdpSocket;
use tokio::time::interval;
use tracing::{debug, warn};

const LOOKUP_INTERVAL: Duration = Duration::from_secs(30);

pub struct DiscoveryService {
    socket: UdpSocket,
    table: RoutingTable,
    secret_key: [u8; 32],
    local_endpoint: Endpoint,
    started_at: Instant,
}

impl DiscoveryService {
    pub async fn bind(
        listen_addr: SocketAddr,
        local_id: NodeId,
        secret_key: [u8; 32],
        tcp_port: u16,
    ) -> Result<Self, NodeError> {
        let socket = UdpSocket::bind(listen_addr).await?;
        let local_endpoint = Endpoint { ip: listen_addr.ip(), udp_port: listen_addr.port(), tcp_port };
        Ok(Self {
            socket,
            table: RoutingTable::new(local_id),
            secret_key,
            local_endpoint,
            started_at: Instant::now(),
        })
    }

    fn now_unix(&self) -> u64 {
        SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_secs()
    }

    fn now(&self) -> Duration {
        self.started_at.elapsed()
    }

    async fn send_to(&self, datagram: &[u8], addr: SocketAddr) {
        if let Err(error) = self.socket.send_to(datagram, addr).await {
            warn!(%addr, %error, "failed to send discovery datagram");
        }
    }

    /// Ping every configured bootnode so they become pending peers and
    /// eventually verified once they pong back.
    async fn bootstrap(&mut self, bootnodes: &[BootNode]) -> Result<(), NodeError> {
        for bootnode in bootnodes {
            let node_id = crate::identity::decode_node_id(&bootnode.node_id)?;
            let endpoint = Endpoint { ip: bootnode.addr.ip(), udp_port: bootnode.addr.port(), tcp_port: bootnode.addr.port() };
            let ping = Ping { from: self.local_endpoint, to: endpoint, expiration: self.now_unix() + 20 };
            let datagram = build_ping(&self.secret_key, &ping);
            let now = self.now();
            self.table.mark_pending(node_id, endpoint, now);
            self.send_to(&datagram, bootnode.addr).await;
        }
        Ok(())
    }

    /// Ask the peers closest to our own id to refresh the table
    /// (spec §4.9's periodic lookup).
    async fn run_lookup(&self) {
        let closest = self.table.closest(&self.table_owner_id(), discovery::K);
        let find = FindNeighbours { target: self.table_owner_id(), expiration: self.now_unix() + 20 };
        let datagram = build_find_neighbours(&self.secret_key, &find);
        for peer in closest {
            let addr = SocketAddr::new(peer.endpoint.ip, peer.endpoint.udp_port);
            self.send_to(&datagram, addr).await;
        }
    }

    fn table_owner_id(&self) -> NodeId {
        crypto::public_key_from_secret(&self.secret_key).expect("identity key is valid")
    }

    /// Drive the socket forever: handle inbound datagrams and run a
    /// periodic table refresh. Returns only on a fatal socket error.
    pub async fn run(mut self, bootnodes: Vec<BootNode>) -> Result<(), NodeError> {
        self.bootstrap(&bootnodes).await?;
        let mut lookup_ticker = interval(LOOKUP_INTERVAL);
        let mut buffer = vec![0u8; discovery::MAX_PACKET_SIZE];

        loop {
            tokio::select! {
                _ = lookup_ticker.tick() => {
                    self.run_lookup().await;
                }
                result = self.socket.recv_from(&mut buffer) => {
                    let (len, from) = result?;
                    self.handle_datagram(&buffer[..len], from).await;
                }
            }
        }
    }

    async fn handle_datagram(&mut self, datagram: &[u8], from: SocketAddr) {
        let (packet, sender_id) = match parse_packet(datagram) {
            Ok(parsed) => parsed,
            Err(error) => {
                debug!(%from, %error, "dropping malformed discovery packet");
                return;
            }
        };
        if let Packet::Ping(ping) = &packet {
            if is_expired(ping.expiration, self.now_unix()) {
                return;
            }
        }

        let secret_key = self.secret_key;
        let local_endpoint = self.local_endpoint;
        let now_unix = self.now_unix();
        let now = self.now();
        let action = handle_packet(&mut self.table, &secret_key, local_endpoint, sender_id, &packet, datagram, now_unix, now);

        match action {
            Action::Reply(datagram) => self.send_to(&datagram, from).await,
            Action::ReplyAnd(first, second) => {
                self.send_to(&first, from).await;
                self.send_to(&second, from).await;
            }
            Action::None => {
                if let Packet::Neighbours(neighbours) = packet {
                    let owner_id = self.table_owner_id();
                    for (endpoint, node_id) in neighbours.nodes {
                        if node_id == owner_id || self.table.contains(&node_id) {
                            continue;
                        }
                        let ping = Ping { from: self.local_endpoint, to: endpoint, expiration: self.now_unix() + 20 };
                        let datagram = build_ping(&self.secret_key, &ping);
                        let now = self.now();
                        self.table.mark_pending(node_id, endpoint, now);
                        let addr = SocketAddr::new(endpoint.ip, endpoint.udp_port);
                        self.send_to(&datagram, addr).await;
                    }
                }
            }
        }
    }
}
