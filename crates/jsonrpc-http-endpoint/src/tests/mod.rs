//! Test modules for the HTTP endpoint
