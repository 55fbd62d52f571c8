quick_error! {
    /// The error type of the crate.
    ///
    /// Only parse boundaries and the structured option getters can fail.
    /// Setters never do: values are masked to the width of their field.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum Error {
        /// The buffer does not hold a well-formed header of the protocol being decoded.
        Malformed(what: &'static str) {
            display("malformed packet: {}", what)
        }
        /// The text is not a valid IPv4 or ethernet address.
        InvalidAddress {
            display("invalid address")
        }
        /// The requested option is not present.
        OptionNotFound {
            display("option not found")
        }
        /// The option is present but its payload does not have the expected shape.
        MalformedOption {
            display("malformed option payload")
        }
    }
}

/// Result alias used throughout the crate.
pub type Result<T> = core::result::Result<T, Error>;
