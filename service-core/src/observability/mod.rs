pub mod logging;
pub mod trace_context;

pub use logging::{TracingOptions, init_tracing};
pub use trace_context::{
    REQUEST_ID_HEADER, TRACEPARENT_HEADER, TRACESTATE_HEADER, TracedClientExt,
    extract_request_id, inject_trace_context, new_request_id, trace_headers,
};
