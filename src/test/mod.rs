//! Test-only helpers shared across modules.

use std::sync::Once;


/// Installs a global tracing subscriber writing through the test harness, once per process.
///
/// Set `RUST_LOG=dnsprove=debug` to see the queries and candidate failures of a test.
pub(crate) fn subscribe() {
	static INSTALL_TRACING_SUBSCRIBER: Once = Once::new();
	INSTALL_TRACING_SUBSCRIBER.call_once(|| {
		let subscriber = tracing_subscriber::FmtSubscriber::builder()
			.with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
			.with_test_writer()
			.finish();
		tracing::subscriber::set_global_default(subscriber).unwrap();
	});
}
