pub type Result<T> = std::result::Result<T, crate::error::Error>;

#[macro_export]
macro_rules! verify_arg {
    ($name:expr, $expr:expr) => {{
        let result = $expr;
        $crate::result::verify_arg(result, stringify!($name), stringify!($expr))?;
    }};
}

#[macro_export]
macro_rules! verify_data {
    ($name:expr, $expr:expr) => {{
        let result = $expr;
        $crate::result::verify_data(result, stringify!($name), stringify!($expr))?;
    }};
}

/// Checks an internal search invariant, returning a
/// [`ContractViolation`](crate::error::ErrorKind::ContractViolation) from the
/// enclosing function when it does not hold.
#[macro_export]
macro_rules! verify_contract {
    ($expr:expr, $($fmt:tt)+) => {{
        if !$expr {
            return Err($crate::error::Error::contract_violation(format!($($fmt)+)).into());
        }
    }};
    ($expr:expr) => {{
        let result = $expr;
        $crate::result::verify_contract(result, stringify!($expr))?;
    }};
}

#[inline]
pub fn verify_arg(predicate: bool, name: &str, condition: &str) -> Result<()> {
    if predicate {
        Ok(())
    } else {
        invalid_arg(name, condition)
    }
}

#[inline]
pub fn verify_data(predicate: bool, name: &str, condition: &str) -> Result<()> {
    if predicate {
        Ok(())
    } else {
        invalid_format(name, condition)
    }
}

#[inline]
pub fn verify_contract(predicate: bool, condition: &str) -> Result<()> {
    if predicate {
        Ok(())
    } else {
        contract_violation(condition)
    }
}

#[cold]
pub fn invalid_arg(name: &str, condition: &str) -> Result<()> {
    Err(crate::error::ErrorKind::InvalidArgument {
        name: name.to_string(),
        message: condition.to_string(),
    }
    .into())
}

#[cold]
pub fn invalid_format(name: &str, condition: &str) -> Result<()> {
    Err(crate::error::ErrorKind::InvalidFormat {
        element: name.to_string(),
        message: condition.to_string(),
    }
    .into())
}

#[cold]
pub fn contract_violation(condition: &str) -> Result<()> {
    Err(crate::error::ErrorKind::ContractViolation {
        message: condition.to_string(),
    }
    .into())
}
