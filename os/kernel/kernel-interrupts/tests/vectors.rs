use kernel_interrupts::emulated::EmulatedInterrupts;
use kernel_interrupts::{
    Dpl, GateType, InterruptControl, VectorError, install_default_vectors,
};

const HANDLER: usize = 0xFFFF_FFFF_8010_2030;
const SELECTOR: u16 = 0x08;

#[test]
fn default_table_covers_every_vector() {
    let irq = EmulatedInterrupts::new();
    install_default_vectors(&irq, HANDLER, SELECTOR);

    irq.with_table(|t| {
        assert_eq!(t.len(), 256);
        assert!(t.is_fully_configured());
        for e in t.iter() {
            assert!(e.is_present());
            assert_eq!(e.handler(), HANDLER);
            assert_eq!(e.selector(), SELECTOR);
            assert_eq!(e.dpl(), Dpl::Ring0);
            assert_eq!(e.gate_type(), Some(GateType::Interrupt));
        }
    });
}

#[test]
fn fresh_table_is_not_configured() {
    let irq = EmulatedInterrupts::new();
    irq.with_table(|t| assert!(!t.is_fully_configured()));
}

#[test]
fn set_vector_overrides_single_gate() {
    let irq = EmulatedInterrupts::new();
    install_default_vectors(&irq, HANDLER, SELECTOR);
    irq.set_vector(0x80, 0x4000, SELECTOR, Dpl::Ring3, GateType::Trap);

    let e = irq.vector(0x80).unwrap();
    assert_eq!(e.handler(), 0x4000);
    assert_eq!(e.dpl(), Dpl::Ring3);
    assert_eq!(e.gate_type(), Some(GateType::Trap));
    assert_eq!(irq.vector(0x7F).unwrap().handler(), HANDLER);
}

#[test]
fn mask_then_unmask_restores_presence() {
    let irq = EmulatedInterrupts::new();
    install_default_vectors(&irq, HANDLER, SELECTOR);

    irq.mask(0x20).unwrap();
    let masked = irq.vector(0x20).unwrap();
    assert!(!masked.is_present());
    assert_eq!(masked.handler(), HANDLER);

    irq.unmask(0x20).unwrap();
    assert!(irq.vector(0x20).unwrap().is_present());
}

#[test]
fn mask_out_of_range_is_rejected() {
    let irq = EmulatedInterrupts::new();
    assert_eq!(irq.mask(256), Err(VectorError::OutOfRange(256)));
    assert_eq!(irq.unmask(usize::MAX), Err(VectorError::OutOfRange(usize::MAX)));
}

#[test]
fn nested_push_pop_restores_outer_state() {
    let irq = EmulatedInterrupts::new();
    irq.enable();

    let outer = irq.push_state();
    irq.disable();
    let inner = irq.push_state();
    irq.disable();

    irq.pop_state(inner);
    assert!(!irq.are_enabled());
    irq.pop_state(outer);
    assert!(irq.are_enabled());
}

#[test]
fn controller_reference_is_a_controller() {
    fn cpu_of(irq: impl InterruptControl) -> usize {
        irq.cpu_id()
    }
    let irq = EmulatedInterrupts::with_cpu_id(3);
    assert_eq!(cpu_of(&irq), 3);
}
