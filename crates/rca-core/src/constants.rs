/// Sample key carrying the environment-phase time delta.
pub const TIME_ENV_KEY: &str = "t_e";

/// Sample key carrying the system-phase time delta.
pub const TIME_SYS_KEY: &str = "t_s";

/// Suffix that addresses the environment component of a clock in listings.
pub const ENV_SUFFIX: &str = "_e";

/// Suffix that addresses the system component of a clock in listings.
pub const SYS_SUFFIX: &str = "_s";

/// Degree carried by initial tokens in graded mode.
pub const FULL_DEGREE: f64 = 1.0;

/// Degree of a definitely false graded comparison.
pub const NO_DEGREE: f64 = 0.0;
