#![no_main]

use classscope::{
    analysis::cfg::FlowGraph,
    classfile::{ExceptionTable, LineNumberTable, LocalVariableTable, Type},
    Parser,
};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let mut parser = Parser::new(data);
    if let Ok(table) = ExceptionTable::read(&mut parser) {
        let mut cfg = FlowGraph::new(0);
        for label in [4, 8, 16, 32] {
            cfg.add_block(label);
        }
        let _ = cfg.add_exception_table(&table, |_| Ok(Type::Null));
    }
    let _ = LineNumberTable::read(&mut parser);
    let _ = LocalVariableTable::read(&mut parser);

    if let Ok(text) = std::str::from_utf8(data) {
        let _ = Type::parse(text);
    }
});
