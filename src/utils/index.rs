/// Shorten an address for display, keeping `edge` characters on each side.
///
/// Addresses too short to benefit are returned unchanged.
pub fn format_address(address: &str, edge: usize) -> String {
	let chars: Vec<char> = address.chars().collect();
	if edge == 0 || chars.len() <= edge * 2 + 3 {
		return address.to_string();
	}

	let head: String = chars[..edge].iter().collect();
	let tail: String = chars[chars.len() - edge..].iter().collect();
	format!("{}...{}", head, tail)
}
