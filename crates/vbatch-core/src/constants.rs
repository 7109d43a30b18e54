pub mod locks {
    pub const BUILD: &str = "build.txt";
    pub const PROPERTY: &str = "property.txt";
    pub const COVERAGE: &str = "coverage.txt";
    pub const REPORT: &str = "report.txt";

    pub const ALL: [&str; 4] = [BUILD, PROPERTY, COVERAGE, REPORT];
}

pub mod defaults {
    pub const JOB_PREFIX: &str = "cbmc";
    pub const JOB_QUEUE: &str = "CBMCJobQueue";
    pub const JOB_OS: &str = "ubuntu14";
    pub const JOB_CC: &str = "gcc";
    pub const REGION: &str = "us-east-1";
    pub const BUCKET: &str = "cbmc";
    pub const GOTO: &str = "main.goto";

    pub const BUILD_MEMORY: u32 = 8000;
    pub const PROPERTY_MEMORY: u32 = 16000;
    pub const COVERAGE_MEMORY: u32 = 16000;
    pub const REPORT_MEMORY: u32 = 8000;

    pub const LOCK_POLL_INTERVAL_SECS: u64 = 15;
    pub const MONITOR_POLL_INTERVAL_SECS: u64 = 5;

    pub const TERMINATE_REASON: &str = "Terminated by vbatch command line";
    pub const STATUS_CONTEXT_PREFIX: &str = "CBMC Batch: ";
}

pub mod job_definitions {
    pub const UBUNTU14_GCC: &str = "CBMCJobUbuntu14Gcc";
    pub const UBUNTU16_GCC: &str = "CBMCJobUbuntu16Gcc";
}

pub mod store {
    pub const S3_SCHEME: &str = "s3://";
    pub const SRC: &str = "src";
    pub const WS: &str = "ws";
    pub const OUT: &str = "out";
}

pub mod env {
    pub const LOG_LEVEL: &str = "VBATCH_LOG_LEVEL";
    pub const TEST_LOG_TEE: &str = "VBATCH_TEST_LOG_TEE";
}
