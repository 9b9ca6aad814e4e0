//! Fully-qualified method paths served by pcbook.

pub const LOGIN: &str = "/pcbook.AuthService/Login";
pub const CREATE_LAPTOP: &str = "/pcbook.LaptopService/CreateLaptop";
pub const SEARCH_LAPTOP: &str = "/pcbook.LaptopService/SearchLaptop";
pub const UPLOAD_IMAGE: &str = "/pcbook.LaptopService/UploadImage";
pub const RATE_LAPTOP: &str = "/pcbook.LaptopService/RateLaptop";

/// Every method path, in declaration order.
pub const ALL: [&str; 5] = [LOGIN, CREATE_LAPTOP, SEARCH_LAPTOP, UPLOAD_IMAGE, RATE_LAPTOP];
