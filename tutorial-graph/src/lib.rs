//! A small GraphQL query engine serving an in-memory tutorial catalogue.
//!
//! Object types and root fields are declared through [`Schema::builder`], query documents are
//! parsed and validated against that schema, then resolved depth-first into a
//! [`graphql::Response`].

#![cfg_attr(feature = "failfast", allow(unreachable_code))]
#![warn(unreachable_pub)]

macro_rules! failfast_debug {
    ($($tokens:tt)+) => {{
        tracing::debug!($($tokens)+);
        #[cfg(feature = "failfast")]
        panic!(
            "failfast triggered. \
            Please remove the feature failfast if you don't want to see these panics"
        );
    }};
}

pub mod json_ext;

pub mod configuration;
pub mod data_source;
pub mod demo;
pub mod error;
mod executable;
pub mod execution;
pub mod graphql;
pub mod resolver;
pub mod spec;

pub use configuration::Configuration;
pub use data_source::DataSource;
pub use executable::main;
pub use executable::Opt;
pub use execution::execute;
pub use execution::Executor;
pub use spec::Schema;
