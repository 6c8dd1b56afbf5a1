pub mod evolution;
pub mod tridiagonal;
