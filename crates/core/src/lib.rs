pub mod common;
pub mod config;

pub mod market {
    pub mod entity;
    pub mod error;
    pub mod port;
}

pub mod flow {
    pub mod entity;
    pub mod error;
    pub mod port;
}

pub mod analysis {
    pub mod entity;
}

pub mod sentiment {
    pub mod entity;
    pub mod error;
    pub mod port;
}

pub mod narrative {
    pub mod entity;
    pub mod error;
    pub mod port;
}

pub mod report {
    pub mod entity;
}

#[cfg(feature = "test-utils")]
pub mod test_utils;
