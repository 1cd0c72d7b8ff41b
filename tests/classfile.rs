//! Class file building block integration tests.
//!
//! Decodes `Code` attribute tables from raw bytes and feeds them into a `FlowGraph`,
//! and checks descriptor parsing and member references through the public API.

use classscope::{
    analysis::cfg::{EdgeKind, FlowGraph},
    classfile::{
        Catch, ExceptionTable, LineNumberTable, LocalVariableTable, MemberRef, NameAndType, Type,
    },
    Error, Parser, Result,
};

/// `Code` attribute tail: exception table followed by a line number table.
const CODE_TAIL: [u8; 24] = [
    // exception_table_length = 2
    0x00, 0x02, //
    // [0, 8) -> 11, catch #3
    0x00, 0x00, 0x00, 0x08, 0x00, 0x0B, 0x00, 0x03, //
    // [4, 8) -> 11, catch-all
    0x00, 0x04, 0x00, 0x08, 0x00, 0x0B, 0x00, 0x00, //
    // line_number_table_length = 1: pc 0 -> line 7
    0x00, 0x01, 0x00, 0x00, 0x00, 0x07,
];

fn graph_with_labels(labels: &[u32]) -> (FlowGraph, Vec<classscope::utils::graph::BlockId>) {
    let mut cfg = FlowGraph::new(labels[0]);
    let mut blocks = vec![cfg.entry()];
    for &label in &labels[1..] {
        blocks.push(cfg.add_block(label));
    }
    (cfg, blocks)
}

#[test]
fn test_exception_table_to_handlers() -> Result<()> {
    let mut parser = Parser::new(&CODE_TAIL);
    let table = ExceptionTable::read(&mut parser)?;
    let lines = LineNumberTable::read(&mut parser)?;
    assert!(!parser.has_more_data());
    assert_eq!(lines.line_at(5), Some(7));

    let (mut cfg, blocks) = graph_with_labels(&[0, 4, 8, 11]);
    cfg.add_edge(blocks[0], blocks[1])?;
    cfg.add_edge(blocks[1], blocks[2])?;

    let mut resolved = Vec::new();
    cfg.add_exception_table(&table, |index| {
        resolved.push(index);
        Ok(Type::object("java/io/IOException"))
    })?;
    assert_eq!(resolved, vec![3]);

    let handlers = cfg.handlers();
    assert_eq!(handlers.len(), 2);
    assert_eq!(handlers[0].protected(), &[blocks[0], blocks[1]]);
    assert_eq!(handlers[0].catch_block(), blocks[3]);
    assert_eq!(
        handlers[0].catch_type(),
        Some(&Type::object("java/io/IOException"))
    );
    assert_eq!(handlers[1].protected(), &[blocks[1]]);
    assert_eq!(handlers[1].catch_type(), None);

    assert_eq!(cfg.catch_blocks(), vec![blocks[3]]);
    assert_eq!(cfg.handlers_protecting(blocks[1]).count(), 2);
    assert_eq!(cfg.handlers_protecting(blocks[2]).count(), 0);
    assert_eq!(cfg.edge_kind(blocks[0], blocks[3]), Some(EdgeKind::Exception));
    assert_eq!(cfg.edge_kind(blocks[1], blocks[3]), Some(EdgeKind::Exception));
    assert!(cfg.is_reachable(blocks[3]));
    Ok(())
}

#[test]
fn test_exception_table_bad_handler_offset() -> Result<()> {
    let table = ExceptionTable::new(vec![Catch {
        start_pc: 0,
        end_pc: 4,
        handler_pc: 6,
        catch_type: 0,
    }]);
    let (mut cfg, _) = graph_with_labels(&[0, 4, 8]);

    let result = cfg.add_exception_table(&table, |_| Ok(Type::Null));
    assert!(matches!(result, Err(Error::GraphError(_))));
    assert!(cfg.handlers().is_empty());
    Ok(())
}

#[test]
fn test_exception_table_failure_leaves_graph_unchanged() -> Result<()> {
    let (mut cfg, blocks) = graph_with_labels(&[0, 4, 8]);
    cfg.add_edge(blocks[0], blocks[1])?;
    let stamp = cfg.stamp();

    let bad_handler = ExceptionTable::new(vec![
        Catch {
            start_pc: 0,
            end_pc: 4,
            handler_pc: 8,
            catch_type: 0,
        },
        Catch {
            start_pc: 4,
            end_pc: 8,
            handler_pc: 8,
            catch_type: 0,
        },
        Catch {
            start_pc: 0,
            end_pc: 8,
            handler_pc: 6,
            catch_type: 0,
        },
    ]);
    let result = cfg.add_exception_table(&bad_handler, |_| Ok(Type::Null));
    assert!(matches!(result, Err(Error::GraphError(_))));
    assert!(cfg.handlers().is_empty());
    assert_eq!(cfg.edge_kind(blocks[0], blocks[2]), None);
    assert_eq!(cfg.stamp(), stamp);
    cfg.check_stamp(stamp)?;

    let bad_type = ExceptionTable::new(vec![
        Catch {
            start_pc: 0,
            end_pc: 4,
            handler_pc: 8,
            catch_type: 0,
        },
        Catch {
            start_pc: 4,
            end_pc: 8,
            handler_pc: 8,
            catch_type: 2,
        },
    ]);
    let result = cfg.add_exception_table(&bad_type, |index| {
        Err(Error::GraphError(format!("constant #{index} is not a class")))
    });
    assert!(result.is_err());
    assert!(cfg.handlers().is_empty());
    assert_eq!(cfg.stamp(), stamp);
    Ok(())
}

#[test]
fn test_exception_table_resolver_failure_propagates() {
    let table = ExceptionTable::new(vec![Catch {
        start_pc: 0,
        end_pc: 4,
        handler_pc: 4,
        catch_type: 9,
    }]);
    let (mut cfg, _) = graph_with_labels(&[0, 4]);

    let result = cfg.add_exception_table(&table, |index| {
        Err(Error::GraphError(format!("constant #{index} is not a class")))
    });
    assert!(matches!(result, Err(Error::GraphError(message)) if message.contains("#9")));
}

#[test]
fn test_truncated_tables() {
    assert!(matches!(
        ExceptionTable::read(&mut Parser::new(&CODE_TAIL[..9])),
        Err(Error::OutOfBounds)
    ));
    assert!(matches!(
        LocalVariableTable::read(&mut Parser::new(&[0x00, 0x01, 0x00])),
        Err(Error::OutOfBounds)
    ));
}

#[test]
fn test_local_variable_ranges() -> Result<()> {
    let raw = [
        0x00, 0x02, //
        // slot 1 live over [0, 10), name #5, type #6
        0x00, 0x00, 0x00, 0x0A, 0x00, 0x05, 0x00, 0x06, 0x00, 0x01, //
        // slot 1 reused over [10, 20), name #7, type #8
        0x00, 0x0A, 0x00, 0x0A, 0x00, 0x07, 0x00, 0x08, 0x00, 0x01,
    ];
    let table = LocalVariableTable::read(&mut Parser::new(&raw))?;

    let names: Vec<u16> = table.live_at(1, 9).map(|v| v.name_index).collect();
    assert_eq!(names, vec![5]);
    let names: Vec<u16> = table.live_at(1, 10).map(|v| v.name_index).collect();
    assert_eq!(names, vec![7]);
    assert_eq!(table.live_at(1, 20).count(), 0);
    assert_eq!(table.live_at(2, 3).count(), 0);
    assert_eq!(table.to_bytes()?, raw);
    Ok(())
}

#[test]
fn test_member_refs_from_descriptors() -> Result<()> {
    let println = MemberRef::new(
        Type::object("java/io/PrintStream"),
        NameAndType::new("println", Type::parse("(Ljava/lang/String;)V")?),
    );
    assert!(println.is_method());
    assert_eq!(println.ty().param_types(), &[Type::object("java/lang/String")]);
    assert_eq!(println.ty().return_type(), Some(&Type::Void));

    let field = MemberRef::new(
        Type::object("java/lang/System"),
        NameAndType::new("out", Type::parse("Ljava/io/PrintStream;")?),
    );
    assert!(!field.is_method());
    assert_eq!(
        field.to_string(),
        "<Field java/lang/System.out Ljava/io/PrintStream;>"
    );

    let matrix = Type::parse("[[D")?;
    assert_eq!(matrix.element_type(), Some(&Type::array(Type::Double)));
    assert_eq!(matrix.to_string(), "[[D");

    assert!(matches!(Type::parse("(I"), Err(Error::Malformed { .. })));
    assert!(matches!(Type::parse("V"), Ok(Type::Void)));
    assert!(matches!(Type::parse("[V"), Err(Error::Malformed { .. })));
    Ok(())
}
