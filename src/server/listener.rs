//! UDP and TCP listener pair (spec §5, §6).
//!
//! `hickory-proto` provides the wire codec but, unlike `hickory-server`,
//! no listener harness; the UDP `recv_from`/`send_to` loop and the TCP
//! 2-byte length-prefix framing are hand-rolled here directly on
//! `tokio::net`, mirroring the source's `miekgdns.Server` goroutine
//! pair (`pkg/server/server.go`) by hand.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream, UdpSocket};

use crate::server::handler::handle_request;
use crate::server::ServerContext;

const UDP_MAX_MESSAGE_SIZE: usize = 4096;

pub async fn serve_udp(addr: SocketAddr, context: Arc<ServerContext>) -> Result<(), std::io::Error> {
    let socket = Arc::new(UdpSocket::bind(addr).await?);
    log::info!("udp listener bound to {addr}");
    let mut buf = vec![0u8; UDP_MAX_MESSAGE_SIZE];
    loop {
        let (len, peer) = socket.recv_from(&mut buf).await?;
        let request = buf[..len].to_vec();
        let socket = socket.clone();
        let context = context.clone();
        // Each datagram is handled on its own task so a slow backend
        // call can't head-of-line block unrelated requests (spec §5).
        // A panic inside the handler is contained by the task boundary:
        // if it joins with an error, we simply send no reply.
        tokio::spawn(async move {
            if let Ok(Some(response)) = tokio::spawn(async move { handle_request(&context, &request).await }).await {
                if let Err(e) = socket.send_to(&response, peer).await {
                    log::warn!("udp reply to {peer} failed: {e}");
                }
            }
        });
    }
}

pub async fn serve_tcp(addr: SocketAddr, context: Arc<ServerContext>) -> Result<(), std::io::Error> {
    let listener = TcpListener::bind(addr).await?;
    log::info!("tcp listener bound to {addr}");
    loop {
        let (stream, peer) = listener.accept().await?;
        let context = context.clone();
        tokio::spawn(async move {
            if let Err(e) = serve_tcp_connection(stream, context).await {
                log::debug!("tcp connection from {peer} ended: {e}");
            }
        });
    }
}

async fn serve_tcp_connection(mut stream: TcpStream, context: Arc<ServerContext>) -> Result<(), std::io::Error> {
    loop {
        let mut len_buf = [0u8; 2];
        if stream.read_exact(&mut len_buf).await.is_err() {
            return Ok(()); // peer closed the connection
        }
        let len = u16::from_be_bytes(len_buf) as usize;
        let mut request = vec![0u8; len];
        stream.read_exact(&mut request).await?;

        let context = context.clone();
        let response = tokio::spawn(async move { handle_request(&context, &request).await }).await.ok().flatten();

        if let Some(response) = response {
            let len_prefix = (response.len() as u16).to_be_bytes();
            stream.write_all(&len_prefix).await?;
            stream.write_all(&response).await?;
        }
    }
}
