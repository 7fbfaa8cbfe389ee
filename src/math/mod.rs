pub mod frustum;
pub mod plane;
