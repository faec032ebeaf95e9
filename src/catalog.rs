#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use crate::config::{AssignmentDef, ComponentDef, Simulator};

/// Shorthand for a catalogue component.
fn chip(name: &str, points: f64, depends_on: &[&str], hint: &str) -> ComponentDef {
    ComponentDef {
        name: name.to_string(),
        points,
        depends_on: depends_on.iter().map(|d| d.to_string()).collect(),
        hint: (!hint.is_empty()).then(|| hint.to_string()),
    }
}

/// Shorthand for a keyword list.
fn words(list: &[&str]) -> Vec<String> {
    list.iter().map(|w| w.to_string()).collect()
}

/// The five course projects graded out of the box.
pub fn builtin() -> Vec<AssignmentDef> {
    vec![
        AssignmentDef {
            number:           1,
            title:            "Logic Gates".into(),
            simulator:        Simulator::HardwareSimulator,
            file_ext:         ".hdl".into(),
            test_dir:         "project01".into(),
            archive_template: Some("HW1_Gates_{first}_{last}".into()),
            keywords:         words(&[
                "logic gate",
                "nand",
                "basic gate",
                "gates from nand",
                "not.hdl",
                "mux",
                "dmux",
            ]),
            components:       vec![
                chip("Not", 0.65, &[], "Not is just Nand(a, a)."),
                chip("And", 0.65, &["Not"], "And = Not(Nand(a, b))."),
                chip("Or", 0.65, &["Not"], "De Morgan's: Or(a,b) = Nand(Not(a), Not(b))."),
                chip("Xor", 0.65, &["Not", "And", "Or"], "Xor is 1 when inputs differ."),
                chip("Mux", 0.65, &["Not", "And", "Or"], "Mux: Or(And(a,Not(sel)), And(b,sel))."),
                chip("DMux", 0.65, &["Not", "And"], "DMux: a=And(in,Not(sel)), b=And(in,sel)."),
                chip("Not16", 0.65, &["Not"], "Apply Not to each of the 16 bits."),
                chip("And16", 0.65, &["And"], "Apply And to each pair of the 16 bits."),
                chip("Or16", 0.65, &["Or"], "Apply Or to each pair of the 16 bits."),
                chip("Mux16", 0.65, &["Mux"], "Apply Mux to each bit pair, sharing sel."),
                chip("Or8Way", 0.70, &["Or"], "Or all 8 bits together."),
                chip(
                    "Mux4Way16",
                    0.65,
                    &["Mux16"],
                    "Two Mux16 with sel[0], then Mux16 with sel[1].",
                ),
                chip(
                    "Mux8Way16",
                    0.75,
                    &["Mux4Way16", "Mux16"],
                    "Two Mux4Way16, then Mux16 with sel[2].",
                ),
                chip("DMux4Way", 0.65, &["DMux"], "DMux by sel[1], then each half by sel[0]."),
                chip(
                    "DMux8Way",
                    0.75,
                    &["DMux4Way", "DMux"],
                    "DMux by sel[2], then DMux4Way on each half.",
                ),
            ],
        },
        AssignmentDef {
            number:           2,
            title:            "ALU".into(),
            simulator:        Simulator::HardwareSimulator,
            file_ext:         ".hdl".into(),
            test_dir:         "project02".into(),
            archive_template: Some("HW2_ALU_{first}_{last}".into()),
            keywords:         words(&["alu", "arithmetic", "adder", "halfadder", "fulladder"]),
            components:       vec![
                chip("HalfAdder", 0.80, &[], "sum=Xor(a,b), carry=And(a,b)."),
                chip("FullAdder", 0.80, &["HalfAdder"], "Two HalfAdders chained, Or the carries."),
                chip("Add16", 0.80, &["HalfAdder", "FullAdder"], "Chain 16 FullAdders."),
                chip("Inc16", 0.80, &["Add16"], "Add16(in, 1)."),
                chip(
                    "ALU",
                    3.00,
                    &["Add16", "Inc16"],
                    "Zero/negate inputs, add or and, negate output.",
                ),
                chip("ALU-nostat", 3.80, &["Add16", "Inc16"], "Same as ALU without zr and ng."),
            ],
        },
        AssignmentDef {
            number:           3,
            title:            "Memory".into(),
            simulator:        Simulator::HardwareSimulator,
            file_ext:         ".hdl".into(),
            test_dir:         "project03".into(),
            archive_template: Some("HW3_Memory_{first}_{last}".into()),
            keywords:         words(&[
                "memory",
                "ram",
                "register",
                "sequential",
                "program counter",
            ]),
            components:       vec![
                chip("Bit", 1.00, &[], "Mux feeding into a DFF."),
                chip("Register", 1.00, &["Bit"], "16 Bit chips in parallel."),
                chip(
                    "RAM8",
                    1.50,
                    &["Register"],
                    "DMux8Way load, 8 Registers, Mux8Way16 outputs.",
                ),
                chip("RAM64", 1.50, &["RAM8"], "8 RAM8 chips."),
                chip("RAM512", 1.50, &["RAM64"], "8 RAM64 chips."),
                chip("RAM4K", 1.50, &["RAM512"], "8 RAM512 chips."),
                chip("RAM16K", 1.00, &["RAM4K"], "4 RAM4K chips."),
                chip("PC", 1.00, &["Register"], "If reset out=0, elif load out=in, elif inc out++."),
            ],
        },
        AssignmentDef {
            number:           4,
            title:            "Machine Language".into(),
            simulator:        Simulator::CpuEmulator,
            file_ext:         ".asm".into(),
            test_dir:         "project04".into(),
            archive_template: Some("HW4_Assembly_{first}_{last}".into()),
            keywords:         words(&["machine language", "assembly", "mult.asm", "fill.asm"]),
            components:       vec![
                chip("Mult", 5.00, &[], "Loop: add R0 to result R1 times. Store in R2."),
                chip("Fill", 5.00, &[], "Read KBD. Nonzero: fill -1. Zero: fill 0. Loop."),
            ],
        },
        AssignmentDef {
            number:           5,
            title:            "Computer Architecture".into(),
            simulator:        Simulator::HardwareSimulator,
            file_ext:         ".hdl".into(),
            test_dir:         "project05".into(),
            archive_template: Some("HW5_Computer_{first}_{last}".into()),
            keywords:         words(&["computer architecture", "cpu", "computer.hdl"]),
            components:       vec![
                chip("Memory", 3.00, &[], "RAM16K + Screen + Keyboard via address bits."),
                chip("CPU", 4.00, &[], "A-inst: load A. C-inst: ALU + jumps."),
                chip("Computer", 3.00, &["Memory", "CPU"], "Wire CPU + Memory + ROM32K."),
            ],
        },
    ]
}
