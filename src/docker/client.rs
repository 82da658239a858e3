use std::path::PathBuf;

use http_body_util::{BodyExt, Empty};
use hyper::body::Bytes;
use hyper::{Method, Request, Uri};
use hyper_util::rt::TokioIo;
use tokio::io::{AsyncRead, AsyncWrite};

use crate::container::ContainerID;

use super::connector::{TcpConnector, UnixConnector};
use super::label::ContainerMetadata;
use super::models::ContainerInspect;
use super::{Error, MetadataProvider, Result};

/// Default endpoint of the docker engine API.
pub const DEFAULT_DOCKER_HOST: &str = "unix:///var/run/docker.sock";

/// Parsed docker engine endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DockerHost {
    Unix(PathBuf),
    Tcp(String),
}

impl std::str::FromStr for DockerHost {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        if let Some(path) = s.strip_prefix("unix://") {
            if !path.is_empty() {
                return Ok(Self::Unix(PathBuf::from(path)));
            }
        } else if let Some(addr) = s
            .strip_prefix("tcp://")
            .or_else(|| s.strip_prefix("http://"))
        {
            let addr = addr.trim_end_matches('/');
            if !addr.is_empty() {
                return Ok(Self::Tcp(addr.to_owned()));
            }
        }

        Err(Error::InvalidHost(s.to_owned()))
    }
}

/// Minimal docker engine API client issuing one HTTP/1.1 request per connection.
#[derive(Debug, Clone)]
pub struct DockerClient<C> {
    endpoint: String,
    connector: C,
}

impl DockerClient<UnixConnector> {
    pub fn unix(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        Self {
            endpoint: path.display().to_string(),
            connector: UnixConnector::new(path),
        }
    }
}

impl DockerClient<TcpConnector> {
    pub fn tcp(addr: impl Into<String>) -> Self {
        let addr = addr.into();
        Self {
            endpoint: addr.clone(),
            connector: TcpConnector::new(addr),
        }
    }
}

impl<C, S> DockerClient<C>
where
    C: tower::Service<Uri, Response = TokioIo<S>, Error = std::io::Error> + Clone + Send + Sync,
    C::Future: Send,
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    /// Fetches the inspect document of a container.
    ///
    /// # Errors
    ///
    /// Returns an error if the daemon cannot be reached, answers with a non-success
    /// status, or sends a body that is not a valid inspect document.
    pub async fn inspect(&self, id: &ContainerID) -> Result<ContainerInspect> {
        let uri = format!("/containers/{id}/json");
        let body = self.get(&uri).await?;

        serde_json::from_slice(&body).map_err(|source| Error::Decode { uri, source })
    }

    async fn get(&self, uri: &str) -> Result<Bytes> {
        let mut connector = self.connector.clone();
        let connect_err = |source: std::io::Error| Error::Connect {
            endpoint: self.endpoint.clone(),
            source,
        };
        std::future::poll_fn(|cx| connector.poll_ready(cx))
            .await
            .map_err(connect_err)?;
        let io = connector
            .call(Uri::from_static("http://docker"))
            .await
            .map_err(connect_err)?;

        let (mut sender, conn) = hyper::client::conn::http1::handshake(io)
            .await
            .map_err(|source| Error::Handshake {
                endpoint: self.endpoint.clone(),
                source,
            })?;
        tokio::spawn(async move {
            if let Err(err) = conn.await {
                log::debug!("docker connection closed with error: {}", err);
            }
        });

        let request = Request::builder()
            .method(Method::GET)
            .uri(uri)
            .header(hyper::header::HOST, "docker")
            .body(Empty::<Bytes>::new())?;

        log::trace!("GET {} via {}", uri, self.endpoint);
        let response = sender
            .send_request(request)
            .await
            .map_err(|source| Error::Send {
                uri: uri.to_owned(),
                source,
            })?;
        let status = response.status();
        let body = response
            .into_body()
            .collect()
            .await
            .map_err(|source| Error::Send {
                uri: uri.to_owned(),
                source,
            })?
            .to_bytes();

        if !status.is_success() {
            return Err(Error::Status {
                uri: uri.to_owned(),
                status,
                body: String::from_utf8_lossy(&body).trim().to_owned(),
            });
        }

        Ok(body)
    }
}

impl<C, S> MetadataProvider for DockerClient<C>
where
    C: tower::Service<Uri, Response = TokioIo<S>, Error = std::io::Error> + Clone + Send + Sync,
    C::Future: Send,
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    async fn metadata(&self, id: &ContainerID) -> Result<ContainerMetadata> {
        let inspect = self.inspect(id).await?;
        Ok(ContainerMetadata {
            command: inspect.command_line(),
            cpu_shares: inspect.cpu_shares(),
        })
    }
}

/// Metadata provider for either supported transport.
#[derive(Debug, Clone)]
pub enum DockerInspector {
    Unix(DockerClient<UnixConnector>),
    Tcp(DockerClient<TcpConnector>),
}

impl DockerInspector {
    pub fn new(host: &DockerHost) -> Self {
        match host {
            DockerHost::Unix(path) => Self::Unix(DockerClient::unix(path.clone())),
            DockerHost::Tcp(addr) => Self::Tcp(DockerClient::tcp(addr.clone())),
        }
    }
}

impl MetadataProvider for DockerInspector {
    async fn metadata(&self, id: &ContainerID) -> Result<ContainerMetadata> {
        match self {
            Self::Unix(client) => client.metadata(id).await,
            Self::Tcp(client) => client.metadata(id).await,
        }
    }
}
