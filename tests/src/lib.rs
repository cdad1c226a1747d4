//! End-to-end runs of the proxy inventory: fixture configuration
//! directories on disk, a scripted host, and the rendered report.

#[cfg(test)]
mod properties;
#[cfg(test)]
mod scenarios;
#[cfg(test)]
mod support;
