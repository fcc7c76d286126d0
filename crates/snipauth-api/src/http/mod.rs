//! HTTP REST API endpoints.
//!
//! | Endpoint | Method | Description |
//! |----------|--------|-------------|
//! | `/permissions` | POST | Add a permission kind to a grant |
//! | `/permissions/query` | POST | Kinds held by a user on a resource |
//! | `/permissions/resources` | GET | Resources visible to the caller |
//! | `/permissions/resources/{id}/share` | POST | Share an owned resource |
//! | `/permissions/friends` | GET | Users the caller shared with |
//! | `/rules/{type}` | GET, POST | List or upsert FORMAT/LINT rules |
//! | `/rules/{id}` | DELETE | Delete an owned rule |
//! | `/testcases` | GET, POST | List or create test cases |
//! | `/testcases/execute` | POST | Run an ad-hoc test case |
//! | `/testcases/{id}` | GET, DELETE | Fetch or delete a test case |
//! | `/testcases/{id}/execute` | POST | Run a stored test case |

pub mod caller;
pub mod error;
pub mod routes;
pub mod state;

pub use caller::{Caller, USER_ID_HEADER};
pub use error::{ApiError, ApiResult};
pub use routes::{create_router, create_router_with_body_limit, DEFAULT_BODY_LIMIT};
pub use state::AppState;
