pub mod decorator;
pub mod identity;
pub mod policy;

pub use decorator::{AuthError, Authenticated, Authenticator, Authorized, RequestContext};
pub use identity::{Principal, RequestPrincipal, SessionKey, Subject, SubjectId, SubjectSet};
pub use policy::{AllowListPolicy, AuthPolicy, FnPolicy};
