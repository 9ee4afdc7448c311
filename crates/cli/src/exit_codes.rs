//! CLI Exit Code Registry
//!
//! Single source of truth for `plantgeo` exit codes. Scripts that chain
//! `build` and `load-db` rely on them.
//!
//! # Exit Code Ranges
//!
//! | Range   | Domain      | Description                              |
//! |---------|-------------|------------------------------------------|
//! | 0       | Universal   | Success                                  |
//! | 2       | Universal   | CLI usage error (bad args, missing file) |
//! | 3-9     | config      | Config file codes                        |
//! | 10-19   | reference   | GCPT reference data codes                |
//! | 20-29   | files       | Input/output table codes                 |
//! | 30-39   | database    | SQLite loading codes                     |
//!
//! # Adding New Exit Codes
//!
//! 1. Add the constant in the appropriate range
//! 2. Document what triggers it
//! 3. Update the table above

// =============================================================================
// Universal (0, 2)
// =============================================================================

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// Usage error - bad arguments, missing required options.
pub const EXIT_USAGE: u8 = 2;

// =============================================================================
// Config (3-9)
// =============================================================================

/// Config file could not be read.
pub const EXIT_CONFIG_READ: u8 = 3;

/// Config file is not valid TOML or fails validation.
pub const EXIT_CONFIG_INVALID: u8 = 4;

// =============================================================================
// Reference (10-19)
// =============================================================================

/// No GCPT file in the data directory, or it could not be read.
pub const EXIT_NO_REFERENCE: u8 = 10;

/// Reference data loaded but no crosswalk had any rows.
pub const EXIT_EMPTY_CROSSWALKS: u8 = 11;

// =============================================================================
// Files (20-29)
// =============================================================================

/// Input table could not be read or lacks a required column.
pub const EXIT_INPUT: u8 = 20;

/// Output file or directory could not be written.
pub const EXIT_OUTPUT: u8 = 21;

// =============================================================================
// Database (30-39)
// =============================================================================

/// SQLite open or load failed.
pub const EXIT_DB: u8 = 30;
