//! Student ability estimation and grade projection
//!
//! Turns a student's prior grades into an ability offset relative to course
//! averages, and projects a personalized GPA estimate onto letter grades.

pub mod adjustment;
pub mod kalman;
pub mod projection;

pub use adjustment::*;
pub use kalman::*;
pub use projection::*;
