use std::sync::Once;
use tracing::Level;

pub fn init_logging() {
	static INIT: Once = Once::new();
	INIT.call_once(|| {
		// Another test binary may have installed a subscriber already.
		let _ = tracing_subscriber::fmt().with_test_writer().with_max_level(Level::TRACE).try_init();
	});
}
