/// Flags of the LVM tools that consume the following argument.
const VALUE_FLAGS: [&str; 6] = [
    "-i",
    "-s",
    "-o",
    "--units",
    "--separator",
    "--setphysicalvolumesize",
];

pub fn render(command: &str, args: &[String]) -> String {
    if args.is_empty() {
        command.to_string()
    } else {
        format!("{} {}", command, args.join(" "))
    }
}

/// Base name of a program path (`/usr/sbin/pvs` -> `pvs`)
pub fn command_name(program: &str) -> &str {
    program.rsplit('/').next().unwrap_or(program)
}

/// Arguments split into switches, valued flags and positional operands
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedArgs {
    pub switches: Vec<String>,
    pub values: Vec<(String, String)>,
    pub operands: Vec<String>,
    pub global_config: Option<String>,
}

impl ParsedArgs {
    pub fn parse(args: &[String]) -> Self {
        let mut parsed = Self::default();
        let mut iter = args.iter();
        while let Some(arg) = iter.next() {
            if let Some(config) = arg.strip_prefix("--config=") {
                parsed.global_config = Some(config.to_string());
            } else if VALUE_FLAGS.contains(&arg.as_str()) {
                let value = iter.next().cloned().unwrap_or_default();
                parsed.values.push((arg.clone(), value));
            } else if arg.starts_with('-') {
                parsed.switches.push(arg.clone());
            } else {
                parsed.operands.push(arg.clone());
            }
        }
        parsed
    }

    pub fn has(&self, switch: &str) -> bool {
        self.switches.iter().any(|candidate| candidate == switch)
    }

    pub fn value(&self, flag: &str) -> Option<&str> {
        self.values
            .iter()
            .find(|(name, _)| name == flag)
            .map(|(_, value)| value.as_str())
    }
}
