//! Catalog handlers: create, search, image upload and rating.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::{Stream, StreamExt};
use tonic::{Request, Response, Status, Streaming};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::caller;
use crate::constants::{CALL_BUFFER_SIZE, MAX_IMAGE_SIZE};
use crate::model::{Filter, Laptop};
use crate::rpc::CallContext;
use crate::rpc::pb::laptop_service_server::LaptopService;
use crate::rpc::pb::{self, upload_image_request::Data};
use crate::store::{ImageStore, LaptopStore, RatingStore, normalize_image_type};

type ResponseSender<T> = mpsc::Sender<Result<T, Status>>;

/// `LaptopService` over the laptop, image and rating stores.
#[derive(Clone)]
pub struct LaptopServer {
    laptops: Arc<dyn LaptopStore>,
    images: Arc<dyn ImageStore>,
    ratings: Arc<dyn RatingStore>,
    max_image_size: usize,
}

impl LaptopServer {
    pub fn new(
        laptops: Arc<dyn LaptopStore>,
        images: Arc<dyn ImageStore>,
        ratings: Arc<dyn RatingStore>,
    ) -> Self {
        Self {
            laptops,
            images,
            ratings,
            max_image_size: MAX_IMAGE_SIZE,
        }
    }

    /// Overrides the upload limit (1 MiB by default).
    #[must_use]
    pub fn with_max_image_size(mut self, max_image_size: usize) -> Self {
        self.max_image_size = max_image_size;
        self
    }

    pub fn max_image_size(&self) -> usize {
        self.max_image_size
    }

    /// Stores a new laptop, assigning a UUID when the id is empty.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` for a missing or malformed laptop or a non-UUID
    /// id, `DeadlineExceeded` if the call ran out of time before saving,
    /// `AlreadyExists` for a taken id.
    pub fn create(
        &self,
        ctx: &CallContext,
        request: pb::CreateLaptopRequest,
    ) -> Result<pb::CreateLaptopResponse, Status> {
        let laptop = request
            .laptop
            .ok_or_else(|| Status::invalid_argument("laptop is not provided"))?;
        let mut laptop = Laptop::try_from(laptop)?;

        if laptop.id.is_empty() {
            laptop.id = Uuid::new_v4().to_string();
        } else if Uuid::parse_str(&laptop.id).is_err() {
            return Err(Status::invalid_argument(format!(
                "laptop ID is not a valid UUID: {}",
                laptop.id
            )));
        }

        ctx.check()?;

        self.laptops.save(&laptop)?;
        info!(laptop_id = %laptop.id, brand = %laptop.brand, "Saved laptop");

        Ok(pb::CreateLaptopResponse { id: laptop.id })
    }

    /// Sends every laptop matching `filter` to `tx`.
    ///
    /// Matches are taken from one snapshot of the store. The search stops
    /// early, and still ends successfully, once the client has gone away or
    /// the deadline has passed.
    pub async fn search(
        &self,
        ctx: &CallContext,
        filter: &Filter,
        tx: &ResponseSender<pb::SearchLaptopResponse>,
    ) {
        let found = self.laptops.search(filter);
        debug!(matches = found.len(), "Searching laptops");

        for (sent, laptop) in found.into_iter().enumerate() {
            if tx.is_closed() || ctx.check().is_err() {
                info!(sent, "Search cancelled");
                return;
            }
            let laptop_id = laptop.id.clone();
            let response = pb::SearchLaptopResponse {
                laptop: Some(laptop.into()),
            };
            if tx.send(Ok(response)).await.is_err() {
                info!(sent, "Search cancelled");
                return;
            }
            debug!(%laptop_id, "Sent laptop");
        }
    }

    /// Receives an image in chunks and saves it once complete.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` when the first message is not the image info, the
    /// image type is unusable, or the image grows past the size limit;
    /// `NotFound` for an unknown laptop; `DeadlineExceeded` when the call
    /// runs out of time mid-upload; the stream's own status if the client
    /// aborts; `Internal` if the image cannot be saved.
    pub async fn receive_image<S>(
        &self,
        ctx: &CallContext,
        mut stream: S,
    ) -> Result<pb::UploadImageResponse, Status>
    where
        S: Stream<Item = Result<pb::UploadImageRequest, Status>> + Unpin,
    {
        let info = match ctx.within(stream.next()).await?.transpose()? {
            Some(pb::UploadImageRequest {
                data: Some(Data::Info(info)),
            }) => info,
            Some(_) => {
                return Err(Status::invalid_argument("first message must carry image info"));
            },
            None => return Err(Status::invalid_argument("image info is not provided")),
        };
        let image_type = normalize_image_type(&info.image_type)
            .map_err(|e| Status::invalid_argument(e.to_string()))?;

        if self.laptops.find(&info.laptop_id).is_none() {
            return Err(Status::not_found(format!(
                "laptop {} doesn't exist",
                info.laptop_id
            )));
        }
        info!(laptop_id = %info.laptop_id, %image_type, "Receiving image");

        let mut data = Vec::new();
        loop {
            ctx.check()?;

            let Some(request) = ctx.within(stream.next()).await?.transpose()? else {
                debug!("No more image data");
                break;
            };
            let Some(Data::ChunkData(chunk)) = request.data else {
                return Err(Status::invalid_argument("expected image data after the info"));
            };

            let size = data.len() + chunk.len();
            if size > self.max_image_size {
                warn!(
                    laptop_id = %info.laptop_id,
                    size,
                    max = self.max_image_size,
                    "Image too large"
                );
                return Err(Status::invalid_argument(format!(
                    "image is too large: {size} > {}",
                    self.max_image_size
                )));
            }
            data.extend_from_slice(&chunk);
        }

        let size = data.len();
        let id = self
            .images
            .save(&info.laptop_id, &image_type, data)
            .await
            .map_err(|e| Status::internal(format!("cannot save image: {e:#}")))?;

        metrics::counter!("pcbook_uploaded_bytes_total").increment(size as u64);
        info!(image_id = %id, size, "Saved image");

        Ok(pb::UploadImageResponse {
            id,
            size: size as u64,
        })
    }

    /// Rates laptops, replying to each rating on `tx` before reading the
    /// next one.
    ///
    /// # Errors
    ///
    /// `NotFound` for an unknown laptop (earlier ratings stay counted),
    /// `DeadlineExceeded` when the call runs out of time, `Cancelled` if
    /// the client stops reading replies.
    pub async fn rate<S>(
        &self,
        ctx: &CallContext,
        mut stream: S,
        tx: &ResponseSender<pb::RateLaptopResponse>,
    ) -> Result<(), Status>
    where
        S: Stream<Item = Result<pb::RateLaptopRequest, Status>> + Unpin,
    {
        loop {
            ctx.check()?;

            let Some(request) = ctx.within(stream.next()).await?.transpose()? else {
                debug!("No more ratings");
                return Ok(());
            };

            if self.laptops.find(&request.laptop_id).is_none() {
                return Err(Status::not_found(format!(
                    "laptop {} doesn't exist",
                    request.laptop_id
                )));
            }

            let rating = self.ratings.add(&request.laptop_id, request.score);
            metrics::counter!("pcbook_ratings_total").increment(1);
            debug!(
                laptop_id = %request.laptop_id,
                score = request.score,
                count = rating.count,
                "Rated laptop"
            );

            let reply = pb::RateLaptopResponse {
                laptop_id: request.laptop_id,
                rated_count: rating.count,
                average_score: rating.average(),
            };
            if tx.send(Ok(reply)).await.is_err() {
                return Err(Status::cancelled("client stopped reading ratings"));
            }
        }
    }
}

#[tonic::async_trait]
impl LaptopService for LaptopServer {
    async fn create_laptop(
        &self,
        request: Request<pb::CreateLaptopRequest>,
    ) -> Result<Response<pb::CreateLaptopResponse>, Status> {
        let ctx = CallContext::from_metadata(request.metadata());
        debug!(user = %caller(&request), "CreateLaptop");
        self.create(&ctx, request.into_inner()).map(Response::new)
    }

    type SearchLaptopStream = ReceiverStream<Result<pb::SearchLaptopResponse, Status>>;

    async fn search_laptop(
        &self,
        request: Request<pb::SearchLaptopRequest>,
    ) -> Result<Response<Self::SearchLaptopStream>, Status> {
        let ctx = CallContext::from_metadata(request.metadata());
        let filter = request
            .into_inner()
            .filter
            .map(Filter::try_from)
            .transpose()?
            .unwrap_or_default();

        let (tx, rx) = mpsc::channel(CALL_BUFFER_SIZE);
        let server = self.clone();
        tokio::spawn(async move { server.search(&ctx, &filter, &tx).await });
        Ok(Response::new(ReceiverStream::new(rx)))
    }

    async fn upload_image(
        &self,
        request: Request<Streaming<pb::UploadImageRequest>>,
    ) -> Result<Response<pb::UploadImageResponse>, Status> {
        let ctx = CallContext::from_metadata(request.metadata());
        debug!(user = %caller(&request), "UploadImage");
        self.receive_image(&ctx, request.into_inner())
            .await
            .map(Response::new)
    }

    type RateLaptopStream = ReceiverStream<Result<pb::RateLaptopResponse, Status>>;

    async fn rate_laptop(
        &self,
        request: Request<Streaming<pb::RateLaptopRequest>>,
    ) -> Result<Response<Self::RateLaptopStream>, Status> {
        let ctx = CallContext::from_metadata(request.metadata());
        debug!(user = %caller(&request), "RateLaptop");
        let stream = request.into_inner();

        let (tx, rx) = mpsc::channel(CALL_BUFFER_SIZE);
        let server = self.clone();
        tokio::spawn(async move {
            if let Err(status) = server.rate(&ctx, stream, &tx).await {
                debug!(code = ?status.code(), "Rating stream ended with an error");
                let _ = tx.send(Err(status)).await;
            }
        });
        Ok(Response::new(ReceiverStream::new(rx)))
    }
}
