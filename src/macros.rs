macro_rules! emit {
    ($output:expr, $opcode:expr) => {
        writeln!($output, "{}", $opcode)
    };

    ($output:expr, $opcode:expr, $($operand:expr),+) => {{
        write!($output, "{}", $opcode)?;
        $(write!($output, " {}", $operand)?;)+
        writeln!($output)
    }};
}
