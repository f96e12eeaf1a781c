/// Name used in generated file headers and log output.
pub const APP_NAME: &str = "pip-deepfreeze";

/// Main frozen requirements file, relative to the project root.
pub const FROZEN_FILENAME: &str = "requirements.txt";

/// User-authored input constraints file, relative to the project root.
pub const INPUT_FILENAME: &str = "requirements.txt.in";

/// Prefix of extra-specific frozen files (`requirements-<extra>.txt`).
pub const FROZEN_EXTRA_PREFIX: &str = "requirements-";

/// First line of every frozen file written by `sync`.
pub const FROZEN_HEADER: &str = "# frozen requirements generated by pip-deepfreeze";

/// Prefix and suffix of the temporary constraints file handed to the installer.
pub const CONSTRAINTS_PREFIX: &str = "requirements.";
pub const CONSTRAINTS_SUFFIX: &str = ".txt.df";
