/// Splits slash-command text into arguments.
///
/// Handles:
/// - Whitespace-separated arguments (space, tab, CR, LF)
/// - Double-quoted runs as one argument, quotes stripped
/// - An unterminated quote, which extends to the end of input
///
/// A closing quote ends the current argument only if it is non-empty, so
/// `""` produces nothing. Single quotes and backslashes are ordinary
/// characters.
pub fn split_args(input: &str) -> Vec<String> {
    let mut args = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;

    for ch in input.chars() {
        match ch {
            '"' => {
                in_quotes = !in_quotes;
                if !in_quotes && !current.is_empty() {
                    args.push(std::mem::take(&mut current));
                }
            }
            ' ' | '\t' | '\n' | '\r' if !in_quotes => {
                if !current.is_empty() {
                    args.push(std::mem::take(&mut current));
                }
            }
            _ => {
                current.push(ch);
            }
        }
    }

    if !current.is_empty() {
        args.push(current);
    }

    args
}
