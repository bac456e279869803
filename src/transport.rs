//! Message channels connecting the two parties of a protocol run.

use std::fmt::Debug;
use std::io;
use std::net::Ipv4Addr;

use async_trait::async_trait;
use futures::channel::mpsc::{self, SendError};
use futures::{SinkExt, StreamExt};

/// Bidirectional, typed channel to the peer party.
#[async_trait]
pub trait Transport<Item: Send>: Send {
    type SinkErr: Debug + Send;
    type StreamErr: Debug + Send;

    async fn send(&mut self, item: Item) -> Result<(), Self::SinkErr>;
    async fn recv(&mut self) -> Option<Result<Item, Self::StreamErr>>;
}

/// Channel pair over in-process queues, mainly useful for tests where both
/// parties run inside one process.
pub struct InMemory<Item> {
    sender: mpsc::UnboundedSender<Item>,
    receiver: mpsc::UnboundedReceiver<Item>,
}

impl<Item> InMemory<Item> {
    pub fn new_pair() -> (InMemory<Item>, InMemory<Item>) {
        let (s1, r1) = mpsc::unbounded();
        let (s2, r2) = mpsc::unbounded();
        let t1 = InMemory {
            sender: s1,
            receiver: r2,
        };
        let t2 = InMemory {
            sender: s2,
            receiver: r1,
        };
        (t1, t2)
    }
}

#[async_trait]
impl<Item: Send> Transport<Item> for InMemory<Item> {
    type SinkErr = SendError;
    type StreamErr = std::convert::Infallible;

    async fn send(&mut self, item: Item) -> Result<(), SendError> {
        self.sender.send(item).await
    }

    async fn recv(&mut self) -> Option<Result<Item, Self::StreamErr>> {
        self.receiver.next().await.map(Ok)
    }
}

pub mod tcp {
    //! TCP transport with length-delimited bincode frames.

    use super::*;

    use serde::de::DeserializeOwned;
    use serde::Serialize;
    use tokio::net::{TcpListener, TcpStream, ToSocketAddrs};
    use tokio_serde::formats::Bincode;
    use tokio_util::codec::{Framed, LengthDelimitedCodec};
    use tracing::info;

    type SerdeFramed<Item> =
        tokio_serde::Framed<Framed<TcpStream, LengthDelimitedCodec>, Item, Item, Bincode<Item, Item>>;

    /// One endpoint of a TCP connection between the parties.
    pub struct Tcp<Item> {
        framed: SerdeFramed<Item>,
    }

    #[async_trait]
    impl<Item> Transport<Item> for Tcp<Item>
    where
        Item: Serialize + DeserializeOwned + Send + Unpin,
    {
        type SinkErr = io::Error;
        type StreamErr = io::Error;

        async fn send(&mut self, item: Item) -> Result<(), io::Error> {
            self.framed.send(item).await
        }

        async fn recv(&mut self) -> Option<Result<Item, io::Error>> {
            self.framed.next().await
        }
    }

    #[tracing::instrument(err)]
    pub async fn listen<Item>(addr: impl ToSocketAddrs + Debug) -> Result<Tcp<Item>, io::Error> {
        info!("Listening for connection");
        let listener = TcpListener::bind(addr).await?;
        let (socket, remote_addr) = listener.accept().await?;
        info!(?remote_addr, "Established connection to remote");
        framed(socket)
    }

    #[tracing::instrument(err)]
    pub async fn connect<Item>(
        remote_addr: impl ToSocketAddrs + Debug,
    ) -> Result<Tcp<Item>, io::Error> {
        info!("Connecting to remote");
        let socket = TcpStream::connect(remote_addr).await?;
        info!("Established connection to server");
        framed(socket)
    }

    /// Two connected endpoints over localhost, for tests. With `None` an
    /// available port is picked at random.
    pub async fn new_local_pair<Item>(
        port: Option<u16>,
    ) -> Result<(Tcp<Item>, Tcp<Item>), io::Error> {
        // use port 0 to bind to an available random one
        let addr = (Ipv4Addr::LOCALHOST, port.unwrap_or(0));
        let listener = TcpListener::bind(addr).await?;
        let addr = listener.local_addr()?;
        let accept = async {
            let (socket, _) = listener.accept().await?;
            Ok(socket)
        };
        let (server, client) = tokio::try_join!(accept, TcpStream::connect(addr))?;
        Ok((framed(server)?, framed(client)?))
    }

    fn framed<Item>(socket: TcpStream) -> Result<Tcp<Item>, io::Error> {
        // send data ASAP
        socket.set_nodelay(true)?;
        let length_delimited = Framed::new(socket, LengthDelimitedCodec::new());
        Ok(Tcp {
            framed: tokio_serde::Framed::new(length_delimited, Bincode::default()),
        })
    }
}
