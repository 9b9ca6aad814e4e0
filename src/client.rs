//! Typed client for the laptop methods.

use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tonic::service::Interceptor;
use tonic::service::interceptor::InterceptedService;
use tonic::transport::Channel;
use tonic::{Request, Response, Status, Streaming};
use tracing::{debug, info};

use crate::auth::ClientAuthInterceptor;
use crate::constants::{CALL_BUFFER_SIZE, DEFAULT_CALL_TIMEOUT, IMAGE_CHUNK_SIZE};
use crate::model::{Filter, Laptop};
use crate::rpc::pb::laptop_service_client::LaptopServiceClient;
use crate::rpc::pb::{self, upload_image_request::Data};

/// Token attachment for a [`LaptopClient`]; anonymous when empty.
#[derive(Clone, Default)]
struct Credentials(Option<ClientAuthInterceptor>);

impl Interceptor for Credentials {
    fn call(&mut self, request: Request<()>) -> Result<Request<()>, Status> {
        match &mut self.0 {
            Some(interceptor) => interceptor.call(request),
            None => Ok(request),
        }
    }
}

/// Calls `LaptopService` methods over a [`Channel`].
///
/// Build it [`with_auth`](Self::with_auth) to reach methods that need a
/// token.
#[derive(Clone)]
pub struct LaptopClient {
    client: LaptopServiceClient<InterceptedService<Channel, Credentials>>,
    timeout: Duration,
}

impl LaptopClient {
    /// A client that sends no token.
    pub fn new(channel: Channel) -> Self {
        Self::with_credentials(channel, Credentials::default())
    }

    /// A client whose calls carry the interceptor's token.
    pub fn with_auth(channel: Channel, interceptor: ClientAuthInterceptor) -> Self {
        Self::with_credentials(channel, Credentials(Some(interceptor)))
    }

    fn with_credentials(channel: Channel, credentials: Credentials) -> Self {
        Self {
            client: LaptopServiceClient::with_interceptor(channel, credentials),
            timeout: DEFAULT_CALL_TIMEOUT,
        }
    }

    /// Sets the deadline applied to every call.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn request<T>(&self, message: T) -> Request<T> {
        let mut request = Request::new(message);
        request.set_timeout(self.timeout);
        request
    }

    /// Creates a laptop and returns its id.
    ///
    /// # Errors
    ///
    /// Returns the call status on failure.
    pub async fn create_laptop(&self, laptop: Laptop) -> Result<String, Status> {
        let request = self.request(pb::CreateLaptopRequest {
            laptop: Some(laptop.into()),
        });
        let id = self.client.clone().create_laptop(request).await?.into_inner().id;
        info!(laptop_id = %id, "Created laptop");
        Ok(id)
    }

    /// Opens a search; results are pulled with [`SearchStream::next`].
    ///
    /// # Errors
    ///
    /// Returns the call status if the call cannot be opened.
    pub async fn search_laptop_stream(&self, filter: Filter) -> Result<SearchStream, Status> {
        let request = self.request(pb::SearchLaptopRequest {
            filter: Some(filter.into()),
        });
        let stream = self.client.clone().search_laptop(request).await?.into_inner();
        Ok(SearchStream {
            inner: Some(stream),
        })
    }

    /// Runs a search to completion and collects every match.
    ///
    /// # Errors
    ///
    /// Returns the call status on failure.
    pub async fn search_laptop(&self, filter: Filter) -> Result<Vec<Laptop>, Status> {
        let mut stream = self.search_laptop_stream(filter).await?;
        let mut found = Vec::new();
        while let Some(laptop) = stream.next().await? {
            debug!(laptop_id = %laptop.id, "Found laptop");
            found.push(laptop);
        }
        Ok(found)
    }

    /// Uploads an image read from `reader` in 1 KiB chunks.
    ///
    /// # Errors
    ///
    /// Returns the server's status if it rejects the upload, or `Internal`
    /// if `reader` fails.
    pub async fn upload_image<R>(
        &self,
        laptop_id: &str,
        image_type: &str,
        mut reader: R,
    ) -> Result<pb::UploadImageResponse, Status>
    where
        R: AsyncRead + Unpin + Send,
    {
        let (tx, rx) = mpsc::channel(CALL_BUFFER_SIZE);
        let request = self.request(ReceiverStream::new(rx));
        let mut client = self.client.clone();
        let call = async move { client.upload_image(request).await.map(Response::into_inner) };

        let info = pb::UploadImageRequest {
            data: Some(Data::Info(pb::ImageInfo {
                laptop_id: laptop_id.to_string(),
                image_type: image_type.to_string(),
            })),
        };
        let send = async move {
            if tx.send(info).await.is_err() {
                return Ok(());
            }
            let mut buffer = vec![0u8; IMAGE_CHUNK_SIZE];
            loop {
                let n = reader
                    .read(&mut buffer)
                    .await
                    .map_err(|e| Status::internal(format!("cannot read image: {e}")))?;
                if n == 0 {
                    break;
                }
                let chunk = pb::UploadImageRequest {
                    data: Some(Data::ChunkData(buffer[..n].to_vec())),
                };
                // The server has answered already; its status comes from `call`.
                if tx.send(chunk).await.is_err() {
                    break;
                }
            }
            Ok::<(), Status>(())
        };

        let ((), response) = tokio::try_join!(send, call)?;
        info!(image_id = %response.id, size = response.size, "Uploaded image");
        Ok(response)
    }

    /// Rates laptops pairwise from `laptop_ids` and `scores`, returning one
    /// reply per rating in order.
    ///
    /// # Errors
    ///
    /// Returns the call status; replies received before a failure are lost.
    pub async fn rate_laptop(
        &self,
        laptop_ids: &[String],
        scores: &[f64],
    ) -> Result<Vec<pb::RateLaptopResponse>, Status> {
        if laptop_ids.len() != scores.len() {
            return Err(Status::invalid_argument(
                "laptop ids and scores must have the same length",
            ));
        }

        let (tx, rx) = mpsc::channel(CALL_BUFFER_SIZE);
        let request = self.request(ReceiverStream::new(rx));
        let mut stream = self.client.clone().rate_laptop(request).await?.into_inner();

        let mut replies = Vec::with_capacity(scores.len());
        for (laptop_id, &score) in laptop_ids.iter().zip(scores) {
            let rating = pb::RateLaptopRequest {
                laptop_id: laptop_id.clone(),
                score,
            };
            if tx.send(rating).await.is_err() {
                return Err(ended_early(&mut stream).await);
            }

            let reply = stream
                .message()
                .await?
                .ok_or_else(|| Status::internal("server ended the stream early"))?;
            debug!(
                laptop_id = %reply.laptop_id,
                rated_count = reply.rated_count,
                average_score = reply.average_score,
                "Received rating"
            );
            replies.push(reply);
        }

        drop(tx);
        while stream.message().await?.is_some() {}
        Ok(replies)
    }
}

/// Status of a call whose request side was closed under us.
async fn ended_early<T>(stream: &mut Streaming<T>) -> Status {
    loop {
        match stream.message().await {
            Ok(Some(_)) => {},
            Ok(None) => return Status::internal("server ended the stream early"),
            Err(status) => return status,
        }
    }
}

/// Results of an open search.
pub struct SearchStream {
    inner: Option<Streaming<pb::SearchLaptopResponse>>,
}

impl SearchStream {
    /// Next matching laptop, or `None` at the end of the search.
    ///
    /// # Errors
    ///
    /// Returns the call status, `Cancelled` after [`cancel`](Self::cancel),
    /// `Internal` for a reply without a laptop.
    pub async fn next(&mut self) -> Result<Option<Laptop>, Status> {
        let Some(stream) = self.inner.as_mut() else {
            return Err(Status::cancelled("search was cancelled"));
        };
        match stream.message().await? {
            Some(response) => {
                let laptop = response
                    .laptop
                    .ok_or_else(|| Status::internal("search reply carries no laptop"))?;
                Laptop::try_from(laptop).map(Some)
            },
            None => Ok(None),
        }
    }

    /// Stops the search. Dropping the stream resets it, so the server
    /// stops sending at its next send.
    pub fn cancel(&mut self) {
        self.inner = None;
    }
}
