//! Service implementations and the [`Server`] that hosts them.
//!
//! | Method path                          | Shape         |
//! |--------------------------------------|---------------|
//! | `/pcbook.AuthService/Login`          | unary         |
//! | `/pcbook.LaptopService/CreateLaptop` | unary         |
//! | `/pcbook.LaptopService/SearchLaptop` | server stream |
//! | `/pcbook.LaptopService/UploadImage`  | client stream |
//! | `/pcbook.LaptopService/RateLaptop`   | bidi stream   |

mod auth;
mod laptop;
mod server;

pub use auth::AuthServer;
pub use laptop::LaptopServer;
pub use server::Server;

use crate::auth::UserClaims;

/// Username the auth layer attached to the request, or `anonymous`.
fn caller<T>(request: &tonic::Request<T>) -> &str {
    request
        .extensions()
        .get::<UserClaims>()
        .map_or("anonymous", |claims| claims.sub.as_str())
}
