//! Typed ID definitions.
//!
//! Each ID type has a unique prefix that identifies what it names.

use crate::define_id;

// Target image / libvirt domain of a disposable guest. Doubles as the guest's
// hostname once it is up.
define_id!(GuestId, "guest");

// One CLI invocation; used to correlate log lines.
define_id!(RunId, "run");
