// Benchmark helper functions - Rust's dead code analysis doesn't understand
// that these are used by benchmark files in the same directory
#[allow(dead_code)]
pub fn generate_template(fields: usize) -> String {
    let mut template = String::new();
    for i in 1..=fields {
        template.push_str(&format!(
            "let ${{{i}:name{i}}}: ${{{i}/(\\w+)/\\u$1/g}} = ${{{n}:value}}; // $ {i}\n",
            n = fields + i
        ));
    }
    template.push_str("$0");
    template
}

#[allow(dead_code)]
pub fn generate_nested_template(depth: usize) -> String {
    let mut template = String::from("leaf");
    for i in (1..=depth).rev() {
        template = format!("${{{i}:({template})}}");
    }
    template.push_str(&format!(" ${depth}"));
    template
}
