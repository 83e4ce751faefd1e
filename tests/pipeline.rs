use anyhow::{anyhow, Result};
use littlec::{
    ast::Tag,
    driver::{self, Compilation, Listings},
    source::Source,
};
use std::rc::Rc;

const FACTORIAL: &str = r#"
PROGRAM factorial
BEGIN
    STRING prompt := "Enter a number: ";
    STRING answer := "Result: ";
    INT n, result;

    -- Nunca se traduce
    FUNCTION INT square(INT x)
    BEGIN
        RETURN x * x;
    END

    FUNCTION VOID main()
    BEGIN
        FLOAT ratio;

        WRITE(prompt);
        READ(n);
        result := 1;

        WHILE (n > 1)
            INT previous;
            previous := n;
            result := result * previous;
            n := n - 1;
        ENDWHILE

        IF (result >= 100)
            ratio := result / 2.0;
        ELSE
            ratio := 0.5;
        ENDIF

        WRITE(answer, result, ratio);
    END
END
"#;

fn compile(text: &str) -> Result<Compilation> {
    let source = Rc::new(Source::new("factorial.ltl", text));
    driver::compile(&source).map_err(|diagnostics| anyhow!("{}", diagnostics))
}

fn render(compilation: &Compilation, listings: Listings) -> Result<String> {
    let mut output = Vec::new();
    compilation.write(listings, &mut output)?;

    Ok(String::from_utf8(output)?)
}

#[test]
fn compiles_complete_program() -> Result<()> {
    let compilation = compile(FACTORIAL)?;
    let target = render(&compilation, Listings::TARGET)?;

    let expected = "\
str var0prompt \"Enter a number: \"
str var0answer \"Result: \"
var var0n
var var0result
var var2ratio
sys writes var0prompt
sys readi var0n
move 1 r0
move r0 var0result
label label0
move var0n r1
move 1 r2
cmpi r1 r2
jle label1
var var3previous
move var0n r3
move r3 var3previous
move var0result r5
move var3previous r6
move r5 r4
muli r6 r4
move r4 var0result
move var0n r8
move 1 r9
move r8 r7
subi r9 r7
move r7 var0n
jmp label0
label label1
move var0result r10
move 100 r11
cmpi r10 r11
jlt label2
move var0result r13
move 2.0 r14
move r13 r12
divr r14 r12
move r12 var2ratio
jmp label3
label label2
move 0.5 r15
move r15 var2ratio
label label3
sys writes var0answer
sys writei var0result
sys writer var2ratio
";

    assert_eq!(target, expected);
    Ok(())
}

#[test]
fn ir_listing_precedes_target() -> Result<()> {
    let compilation = compile(FACTORIAL)?;
    let listing = render(&compilation, Listings::default())?;

    let (ir, target) = listing
        .split_once("\n\n")
        .ok_or_else(|| anyhow!("missing separator"))?;

    assert!(ir.lines().all(|line| line.starts_with(';')));
    assert!(ir.starts_with(";WRITES var0prompt\n;READI var0n\n"));
    assert!(ir.contains(";LEI $T1 $T2 label1\n"));
    assert!(ir.contains(";DIVF $T13 $T14 $T12\n"));
    assert!(target.starts_with("str var0prompt"));

    Ok(())
}

#[test]
fn output_is_deterministic() -> Result<()> {
    let first = render(&compile(FACTORIAL)?, Listings::all())?;
    let second = render(&compile(FACTORIAL)?, Listings::all())?;

    assert_eq!(first, second);
    Ok(())
}

#[test]
fn tree_has_single_program_root() -> Result<()> {
    let compilation = compile(FACTORIAL)?;
    let tree = compilation.ast.tree();

    assert_eq!(tree.tag(), Tag::Program);
    assert_eq!(tree.children().len(), 3);

    let functions = &tree.children()[2];
    assert_eq!(functions.tag(), Tag::FunctionList);
    assert_eq!(functions.children().len(), 2);

    let square = &functions.children()[0];
    let statements = &square.children()[4];
    assert_eq!(statements.children()[0].tag(), Tag::Return);

    Ok(())
}

#[test]
fn diagnostics_point_at_source() -> Result<()> {
    let text = "PROGRAM p\nBEGIN\n    FUNCTION VOID main()\n    BEGIN\n        x := 1;\n    END\nEND\n";

    let error = match compile(text) {
        Ok(_) => return Err(anyhow!("undeclared variable was accepted")),
        Err(error) => error.to_string(),
    };

    let expected = "\
Semantic error: Line 5: Variable 'x' is not declared in this scope
x := 1;
^

Build failed with 1 error
";

    assert_eq!(error, expected);
    Ok(())
}
