use std::path::PathBuf;
use std::{pin, task};

use hyper_util::rt::TokioIo;

type ConnectFuture<S> =
    pin::Pin<Box<dyn Future<Output = Result<TokioIo<S>, std::io::Error>> + Send>>;

/// Opens a fresh stream to the docker daemon's unix socket for every request.
#[derive(Debug, Clone)]
pub struct UnixConnector {
    path: PathBuf,
}

impl UnixConnector {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl tower::Service<hyper::Uri> for UnixConnector {
    type Response = TokioIo<tokio::net::UnixStream>;

    type Error = std::io::Error;

    type Future = ConnectFuture<tokio::net::UnixStream>;

    fn poll_ready(&mut self, _cx: &mut task::Context<'_>) -> task::Poll<Result<(), Self::Error>> {
        task::Poll::Ready(Ok(()))
    }

    fn call(&mut self, _req: hyper::Uri) -> Self::Future {
        let path = self.path.clone();
        Box::pin(async move {
            let stream = tokio::net::UnixStream::connect(path).await?;

            Ok(TokioIo::new(stream))
        })
    }
}

/// Opens a fresh TCP stream to a docker daemon listening on `host:port`.
#[derive(Debug, Clone)]
pub struct TcpConnector {
    addr: String,
}

impl TcpConnector {
    pub fn new(addr: impl Into<String>) -> Self {
        Self { addr: addr.into() }
    }
}

impl tower::Service<hyper::Uri> for TcpConnector {
    type Response = TokioIo<tokio::net::TcpStream>;

    type Error = std::io::Error;

    type Future = ConnectFuture<tokio::net::TcpStream>;

    fn poll_ready(&mut self, _cx: &mut task::Context<'_>) -> task::Poll<Result<(), Self::Error>> {
        task::Poll::Ready(Ok(()))
    }

    fn call(&mut self, _req: hyper::Uri) -> Self::Future {
        let addr = self.addr.clone();
        Box::pin(async move {
            let stream = tokio::net::TcpStream::connect(addr).await?;
            stream.set_nodelay(true)?;

            Ok(TokioIo::new(stream))
        })
    }
}
