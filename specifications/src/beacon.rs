//  BEACON.rs
//    by Lut99
//
//  Created:
//    14 Feb 2023, 10:12:41
//  Last edited:
//    02 Mar 2023, 16:05:19
//  Auto updated?
//    Yes
//
//  Description:
//!   Defines the prost messages and the gRPC client/server for
//!   interacting with the beacon.
//

use std::error;
use std::fmt::{Display, Formatter, Result as FResult};
use std::sync::Arc;

use async_trait::async_trait;
use prost::Message;
use tonic::{Code, Request, Response, Status};
use tonic::body::{empty_body, BoxBody};
use tonic::client::Grpc as GrpcClient;
use tonic::codec::{ProstCodec, Streaming};
use tonic::codegen::{Body, BoxFuture, Context, Poll, Service, StdError};
use tonic::codegen::futures_core::Stream;
use tonic::codegen::http;
use tonic::server::{Grpc as GrpcServer, ServerStreamingService, UnaryService};
use tonic::transport::{Channel, Endpoint};
use tonic::transport::NamedService;

pub use BeaconServiceError as Error;


/***** ERRORS *****/
/// Defines the errors occuring in the BeaconServiceClient or BeaconServiceServer.
#[derive(Debug)]
pub enum BeaconServiceError {
    /// Failed to create an endpoint with the given address.
    EndpointError{ address: String, err: tonic::transport::Error },
    /// Failed to connect to the given address.
    ConnectError{ address: String, err: tonic::transport::Error },
}
impl Display for BeaconServiceError {
    #[inline]
    fn fmt(&self, f: &mut Formatter<'_>) -> FResult {
        use BeaconServiceError::*;
        match self {
            EndpointError{ address, err } => write!(f, "Failed to create a new Endpoint from '{}': {}", address, err),
            ConnectError{ address, err }  => write!(f, "Failed to connect to beacon endpoint '{}': {}", address, err),
        }
    }
}
impl error::Error for BeaconServiceError {}





/***** CONSTANTS *****/
/// The `ack` value that means the beacon accepted the job.
pub const ACK_ACCEPTED: i32 = 0;
/// The `ack` value that means the beacon is already running another job.
pub const ACK_BUSY: i32 = 1;
/// The `ack` value that means the beacon refused the job for another reason.
pub const ACK_REJECTED: i32 = 2;

/// The `kind` of a monitor message carrying a line of a process' stdout.
pub const MONITOR_STDOUT: i32 = 0;
/// The `kind` of a monitor message carrying a line of a process' stderr.
pub const MONITOR_STDERR: i32 = 1;
/// The `kind` of a monitor message notifying one of the job's processes has exited.
pub const MONITOR_PROCESS_EXIT: i32 = 2;
/// The `kind` of a monitor message notifying the job has been aborted.
pub const MONITOR_JOB_ABORTED: i32 = 3;





/***** MESSAGES *****/
/// Request for checking whether the beacon is alive.
#[derive(Clone, Message)]
pub struct PingRequest {}

/// The reply sent by a living beacon.
#[derive(Clone, Message)]
pub struct PingReply {
    /// The version of the beacon that answered.
    #[prost(tag = "1", required, string)]
    pub version : String,
}



/// Request for running a new job.
#[derive(Clone, Message)]
pub struct RunRequest {
    /// The number of processes to spawn.
    #[prost(tag = "1", required, uint32)]
    pub size  : u32,
    /// The (absolute) path to the application's entrypoint.
    #[prost(tag = "2", required, string)]
    pub entry : String,
    /// The normalized hosts file, encoded as JSON.
    #[prost(tag = "3", required, string)]
    pub hosts : String,
}

/// The replies streamed by the beacon in response to a RunRequest.
///
/// The first reply always carries the `ack`; any reply after that carries an `event`.
#[derive(Clone, Message)]
pub struct RunReply {
    /// If given, the beacon's answer to the request (see the `ACK_*` constants).
    #[prost(tag = "1", optional, int32)]
    pub ack    : Option<i32>,
    /// If given, the reason why the beacon rejected the request.
    #[prost(tag = "2", optional, string)]
    pub reason : Option<String>,

    /// If given, something happened in the running job.
    #[prost(tag = "3", optional, message)]
    pub event : Option<MonitorMessage>,
}

/// A single notification about a running job.
#[derive(Clone, Message)]
pub struct MonitorMessage {
    /// What kind of notification this is (see the `MONITOR_*` constants).
    #[prost(tag = "1", required, int32)]
    pub kind   : i32,
    /// The line written by a process, for stdout and stderr messages.
    #[prost(tag = "2", optional, string)]
    pub line   : Option<String>,
    /// The reason the job was aborted, for abort messages.
    #[prost(tag = "3", optional, string)]
    pub reason : Option<String>,
}



/// Request that tells the beacon all processes of the active job are accounted for.
#[derive(Clone, Message)]
pub struct DoneRequest {}

/// Request that tells the beacon to kill the active job.
#[derive(Clone, Message)]
pub struct AbortRequest {}

/// The (empty) reply to a DoneRequest or AbortRequest.
#[derive(Clone, Message)]
pub struct SignalReply {}



/// Request for shutting the beacon down.
#[derive(Clone, Message)]
pub struct StopRequest {}

/// The reply sent by the beacon when asked to shut down.
#[derive(Clone, Message)]
pub struct StopReply {
    /// Whether the beacon is going down (false if it's still running a job).
    #[prost(tag = "1", required, bool)]
    pub stopped : bool,
}





/***** SERVICES *****/
/// The BeaconServiceClient can connect to a remote server implementing the BeaconService protocol.
#[derive(Debug, Clone)]
pub struct BeaconServiceClient {
    /// The client with which we actually do everything
    client : GrpcClient<Channel>,
}

impl BeaconServiceClient {
    /// Attempts to connect to the remote endpoint.
    ///
    /// # Arguments
    /// - `address`: The address of the remote endpoint to connect to.
    ///
    /// # Returns
    /// A new BeaconServiceClient instance that is connected to the remove endpoint.
    ///
    /// # Errors
    /// This function errors if the connection could not be established for whatever reason.
    pub async fn connect(address: impl Into<String>) -> Result<Self, Error> {
        let address: String = address.into();

        // Attempt to make the connection
        let conn: Channel = match Endpoint::new(address.clone()) {
            Ok(endpoint) => match endpoint.connect().await {
                Ok(conn) => conn,
                Err(err) => { return Err(Error::ConnectError{ address, err }); },
            },
            Err(err) => { return Err(Error::EndpointError{ address, err }); },
        };

        // Store it internally
        Ok(Self {
            client : GrpcClient::new(conn),
        })
    }



    /// Helper that waits until the underlying client is ready to send.
    async fn ready(&mut self) -> Result<(), Status> {
        match self.client.ready().await {
            Ok(_)    => Ok(()),
            Err(err) => Err(Status::new(Code::Unknown, format!("Service was not ready: {}", err))),
        }
    }

    /// Send a PingRequest to the connected endpoint.
    ///
    /// # Errors
    /// This function errors if either we failed to send the request or the endpoint itself failed to process it.
    pub async fn ping(&mut self, request: impl tonic::IntoRequest<PingRequest>) -> Result<Response<PingReply>, Status> {
        self.ready().await?;
        let codec : ProstCodec<_, _>        = ProstCodec::default();
        let path  : http::uri::PathAndQuery = http::uri::PathAndQuery::from_static("/klyng.BeaconService/Ping");
        self.client.unary(request.into_request(), path, codec).await
    }

    /// Send a RunRequest to the connected endpoint.
    ///
    /// # Arguments
    /// - `request`: The RunRequest to send to the endpoint.
    ///
    /// # Returns
    /// The stream of RunReplies the endpoint returns, starting with its acknowledgement.
    ///
    /// # Errors
    /// This function errors if either we failed to send the request or the endpoint itself failed to process it.
    pub async fn run(&mut self, request: impl tonic::IntoRequest<RunRequest>) -> Result<Response<Streaming<RunReply>>, Status> {
        self.ready().await?;
        let codec : ProstCodec<_, _>        = ProstCodec::default();
        let path  : http::uri::PathAndQuery = http::uri::PathAndQuery::from_static("/klyng.BeaconService/Run");
        self.client.server_streaming(request.into_request(), path, codec).await
    }

    /// Send a DoneRequest to the connected endpoint.
    ///
    /// # Errors
    /// This function errors if either we failed to send the request or the endpoint itself failed to process it.
    pub async fn done(&mut self, request: impl tonic::IntoRequest<DoneRequest>) -> Result<Response<SignalReply>, Status> {
        self.ready().await?;
        let codec : ProstCodec<_, _>        = ProstCodec::default();
        let path  : http::uri::PathAndQuery = http::uri::PathAndQuery::from_static("/klyng.BeaconService/Done");
        self.client.unary(request.into_request(), path, codec).await
    }

    /// Send an AbortRequest to the connected endpoint.
    ///
    /// # Errors
    /// This function errors if either we failed to send the request or the endpoint itself failed to process it.
    pub async fn abort(&mut self, request: impl tonic::IntoRequest<AbortRequest>) -> Result<Response<SignalReply>, Status> {
        self.ready().await?;
        let codec : ProstCodec<_, _>        = ProstCodec::default();
        let path  : http::uri::PathAndQuery = http::uri::PathAndQuery::from_static("/klyng.BeaconService/Abort");
        self.client.unary(request.into_request(), path, codec).await
    }

    /// Send a StopRequest to the connected endpoint.
    ///
    /// # Errors
    /// This function errors if either we failed to send the request or the endpoint itself failed to process it.
    pub async fn stop(&mut self, request: impl tonic::IntoRequest<StopRequest>) -> Result<Response<StopReply>, Status> {
        self.ready().await?;
        let codec : ProstCodec<_, _>        = ProstCodec::default();
        let path  : http::uri::PathAndQuery = http::uri::PathAndQuery::from_static("/klyng.BeaconService/Stop");
        self.client.unary(request.into_request(), path, codec).await
    }
}



/// The BeaconService, which is a trait for easily writing a service for the beacon communication protocol.
///
/// Implementation based on the auto-generated version from tonic.
#[async_trait]
pub trait BeaconService: 'static + Send + Sync {
    /// The response type for stream returned by `BeaconService::run()`.
    type RunStream: 'static + Send + Stream<Item = Result<RunReply, Status>>;



    /// Handle for when a PingRequest comes in.
    async fn ping(&self, request: Request<PingRequest>) -> Result<Response<PingReply>, Status>;

    /// Handle for when a RunRequest comes in.
    ///
    /// # Arguments
    /// - `request`: The (`tonic::Request`-wrapped) RunRequest containing the job.
    ///
    /// # Returns
    /// A stream of RunReply messages. The first must carry the acknowledgement; the rest report on the job's progress.
    ///
    /// # Errors
    /// This function may error (i.e., send back a `tonic::Status`) whenever it fails.
    async fn run(&self, request: Request<RunRequest>) -> Result<Response<Self::RunStream>, Status>;

    /// Handle for when a DoneRequest comes in.
    async fn done(&self, request: Request<DoneRequest>) -> Result<Response<SignalReply>, Status>;

    /// Handle for when an AbortRequest comes in.
    async fn abort(&self, request: Request<AbortRequest>) -> Result<Response<SignalReply>, Status>;

    /// Handle for when a StopRequest comes in.
    async fn stop(&self, request: Request<StopRequest>) -> Result<Response<StopReply>, Status>;
}

/// The BeaconServiceServer hosts the server part of the BeaconService protocol.
#[derive(Debug)]
pub struct BeaconServiceServer<T> {
    /// The service that we host.
    service : Arc<T>,
}

impl<T: BeaconService> BeaconServiceServer<T> {
    /// Constructor for the BeaconServiceServer.
    ///
    /// # Arguments
    /// - `service`: The BeaconService to host.
    ///
    /// # Returns
    /// A new BeaconServiceServer that can be given to a `tonic::transport::Server`.
    #[inline]
    pub fn new(service: T) -> Self {
        Self { service: Arc::new(service) }
    }
}

impl<T> Clone for BeaconServiceServer<T> {
    #[inline]
    fn clone(&self) -> Self {
        Self { service: self.service.clone() }
    }
}

/// Generates a helper struct that forwards one unary call to the given BeaconService method.
macro_rules! unary_svc {
    ($name:ident, $method:ident, $req:ty, $res:ty) => {
        /// Helper struct for the given BeaconService that focusses specifically on this request.
        struct $name<T>(Arc<T>);
        impl<T: BeaconService> UnaryService<$req> for $name<T> {
            type Response = $res;
            type Future   = BoxFuture<Response<Self::Response>, Status>;

            fn call(&mut self, req: Request<$req>) -> Self::Future {
                let service = self.0.clone();
                let fut = async move { (*service).$method(req).await };
                Box::pin(fut)
            }
        }
    };
}

unary_svc!(PingSvc, ping, PingRequest, PingReply);
unary_svc!(DoneSvc, done, DoneRequest, SignalReply);
unary_svc!(AbortSvc, abort, AbortRequest, SignalReply);
unary_svc!(StopSvc, stop, StopRequest, StopReply);

/// Helper struct for the given BeaconService that focusses specifically on RunRequests.
struct RunSvc<T>(Arc<T>);
impl<T: BeaconService> ServerStreamingService<RunRequest> for RunSvc<T> {
    type Response       = RunReply;
    type ResponseStream = T::RunStream;
    type Future         = BoxFuture<Response<Self::ResponseStream>, Status>;

    fn call(&mut self, req: Request<RunRequest>) -> Self::Future {
        let service = self.0.clone();
        let fut = async move { (*service).run(req).await };
        Box::pin(fut)
    }
}

impl<T, B> Service<http::Request<B>> for BeaconServiceServer<T>
where
    T: BeaconService,
    B: 'static + Send + Body,
    B::Error: 'static + Send + Into<StdError>,
{
    type Response = http::Response<BoxBody>;
    type Error    = std::convert::Infallible;
    type Future   = BoxFuture<Self::Response, Self::Error>;

    #[inline]
    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: http::Request<B>) -> Self::Future {
        let service = self.service.clone();
        match req.uri().path() {
            "/klyng.BeaconService/Ping" => Box::pin(async move {
                let mut grpc : GrpcServer<ProstCodec<_, _>> = GrpcServer::new(ProstCodec::default());
                Ok(grpc.unary(PingSvc(service), req).await)
            }),
            "/klyng.BeaconService/Run" => Box::pin(async move {
                let mut grpc : GrpcServer<ProstCodec<_, _>> = GrpcServer::new(ProstCodec::default());
                Ok(grpc.server_streaming(RunSvc(service), req).await)
            }),
            "/klyng.BeaconService/Done" => Box::pin(async move {
                let mut grpc : GrpcServer<ProstCodec<_, _>> = GrpcServer::new(ProstCodec::default());
                Ok(grpc.unary(DoneSvc(service), req).await)
            }),
            "/klyng.BeaconService/Abort" => Box::pin(async move {
                let mut grpc : GrpcServer<ProstCodec<_, _>> = GrpcServer::new(ProstCodec::default());
                Ok(grpc.unary(AbortSvc(service), req).await)
            }),
            "/klyng.BeaconService/Stop" => Box::pin(async move {
                let mut grpc : GrpcServer<ProstCodec<_, _>> = GrpcServer::new(ProstCodec::default());
                Ok(grpc.unary(StopSvc(service), req).await)
            }),

            // Unknown method; answer with 'unimplemented'
            _ => Box::pin(async move {
                let mut res: http::Response<BoxBody> = http::Response::new(empty_body());
                res.headers_mut().insert("grpc-status", http::HeaderValue::from_static("12"));
                res.headers_mut().insert("content-type", http::HeaderValue::from_static("application/grpc"));
                Ok(res)
            }),
        }
    }
}
impl<T: BeaconService> NamedService for BeaconServiceServer<T> {
    const NAME: &'static str = "klyng.BeaconService";
}
