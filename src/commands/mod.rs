pub mod drawer;
pub mod sales;
pub mod session;
pub mod zreport;
