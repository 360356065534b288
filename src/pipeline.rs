//! Explicit middleware pipeline composed by the client.
//!
//! A request passes through every [`OutboundStage`] in order, is sent once through the
//! [`HttpTransport`], and the resulting [`Exchange`] then passes through every [`InboundStage`]
//! in order. Inbound stages may replay the request through the same transport (the refresh
//! stage does), but they never re-enter the outbound stages, so a replayed request keeps the
//! headers the replaying stage gave it.

pub mod bearer;
pub mod logout;
pub mod unauthorized;

pub use bearer::BearerAuth;
pub use logout::{FailClosedLogout, SessionExpiredHandler};
pub use unauthorized::RefreshOnUnauthorized;

// self
use crate::{
	_prelude::*,
	http::{ApiRequest, HttpTransport, RawResponse},
};

/// Boxed future returned by pipeline stages.
pub type StageFuture<'a, T> = Pin<Box<dyn Future<Output = T> + 'a + Send>>;

/// Stage that transforms a request before it is sent.
pub trait OutboundStage
where
	Self: Send + Sync,
{
	/// Mutates `request` in place; an error aborts the request before it is sent.
	fn on_request<'a>(&'a self, request: &'a mut ApiRequest) -> StageFuture<'a, Result<()>>;
}

/// Stage that observes or replaces the outcome of a sent request.
pub trait InboundStage
where
	Self: Send + Sync,
{
	/// Inspects `exchange`, optionally replaying its request through `transport`.
	fn on_exchange<'a>(
		&'a self,
		exchange: Exchange,
		transport: &'a dyn HttpTransport,
	) -> StageFuture<'a, Exchange>;
}

/// A request together with the outcome it produced.
#[derive(Debug)]
pub struct Exchange {
	/// The request as last sent.
	pub request: ApiRequest,
	/// Transport outcome; any HTTP status counts as `Ok`.
	pub outcome: Result<RawResponse>,
}
impl Exchange {
	/// Returns `true` if the exchange ended in a 401 or in a failed token refresh.
	pub fn is_unauthorized(&self) -> bool {
		match &self.outcome {
			Ok(response) => response.is_unauthorized(),
			Err(Error::Refresh(_)) => true,
			Err(err) => err.is_unauthorized(),
		}
	}

	/// Converts the outcome into a result, turning non-2xx responses into [`Error::Status`].
	pub fn into_result(self) -> Result<RawResponse> {
		self.outcome.and_then(RawResponse::error_for_status)
	}
}

/// Ordered outbound and inbound stages.
#[derive(Clone, Default)]
pub struct Pipeline {
	outbound: Vec<Arc<dyn OutboundStage>>,
	inbound: Vec<Arc<dyn InboundStage>>,
}
impl Pipeline {
	/// Creates an empty pipeline.
	pub fn new() -> Self {
		Self::default()
	}

	/// Appends an outbound stage.
	pub fn with_outbound(mut self, stage: Arc<dyn OutboundStage>) -> Self {
		self.outbound.push(stage);

		self
	}

	/// Appends an inbound stage.
	pub fn with_inbound(mut self, stage: Arc<dyn InboundStage>) -> Self {
		self.inbound.push(stage);

		self
	}

	/// Runs `request` through every stage and the transport.
	pub async fn dispatch(
		&self,
		transport: &dyn HttpTransport,
		mut request: ApiRequest,
	) -> Exchange {
		for stage in &self.outbound {
			if let Err(err) = stage.on_request(&mut request).await {
				return Exchange { request, outcome: Err(err) };
			}
		}

		let outcome = transport.send(request.clone()).await;
		let mut exchange = Exchange { request, outcome };

		for stage in &self.inbound {
			exchange = stage.on_exchange(exchange, transport).await;
		}

		exchange
	}
}
impl Debug for Pipeline {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Pipeline")
			.field("outbound", &self.outbound.len())
			.field("inbound", &self.inbound.len())
			.finish()
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::{error::RefreshError, http::TransportFuture};

	struct Echo;
	impl HttpTransport for Echo {
		fn send(&self, request: ApiRequest) -> TransportFuture<'_> {
			Box::pin(async move {
				let tag = request.header("X-Tag").unwrap_or_default().to_owned();

				Ok(RawResponse::new(200, tag))
			})
		}
	}

	struct Tag(&'static str);
	impl OutboundStage for Tag {
		fn on_request<'a>(&'a self, request: &'a mut ApiRequest) -> StageFuture<'a, Result<()>> {
			Box::pin(async move {
				let tag = format!("{}{}", request.header("X-Tag").unwrap_or_default(), self.0);

				request.set_header("X-Tag", tag);

				Ok(())
			})
		}
	}

	struct Reject;
	impl OutboundStage for Reject {
		fn on_request<'a>(&'a self, _request: &'a mut ApiRequest) -> StageFuture<'a, Result<()>> {
			Box::pin(async move { Err(RefreshError::Unsupported.into()) })
		}
	}

	struct Upcase;
	impl InboundStage for Upcase {
		fn on_exchange<'a>(
			&'a self,
			mut exchange: Exchange,
			_transport: &'a dyn HttpTransport,
		) -> StageFuture<'a, Exchange> {
			Box::pin(async move {
				if let Ok(response) = &mut exchange.outcome {
					response.body.make_ascii_uppercase();
				}

				exchange
			})
		}
	}

	#[tokio::test]
	async fn stages_run_in_registration_order() {
		let pipeline = Pipeline::new()
			.with_outbound(Arc::new(Tag("a")))
			.with_outbound(Arc::new(Tag("b")))
			.with_inbound(Arc::new(Upcase));
		let exchange = pipeline.dispatch(&Echo, ApiRequest::get("/")).await;

		assert_eq!(exchange.request.header("X-Tag"), Some("ab"));

		let response = exchange.into_result().expect("Echo responses are 2xx.");

		assert_eq!(response.body, b"AB");
	}

	#[tokio::test]
	async fn outbound_errors_skip_the_transport() {
		let pipeline =
			Pipeline::new().with_outbound(Arc::new(Reject)).with_outbound(Arc::new(Tag("a")));
		let exchange = pipeline.dispatch(&Echo, ApiRequest::get("/")).await;

		assert_eq!(exchange.request.header("X-Tag"), None);
		assert!(matches!(exchange.outcome, Err(Error::Refresh(RefreshError::Unsupported))));
	}

	#[test]
	fn unauthorized_covers_401_and_refresh_failures() {
		let ok = Exchange { request: ApiRequest::get("/"), outcome: Ok(RawResponse::new(200, "")) };
		let denied =
			Exchange { request: ApiRequest::get("/"), outcome: Ok(RawResponse::new(401, "")) };
		let failed = Exchange {
			request: ApiRequest::get("/"),
			outcome: Err(RefreshError::Abandoned.into()),
		};

		assert!(!ok.is_unauthorized());
		assert!(denied.is_unauthorized());
		assert!(failed.is_unauthorized());
		assert!(matches!(denied.into_result(), Err(Error::Status { status: 401, .. })));
	}
}
