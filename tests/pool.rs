use anyhow::Result;

use deimos::{BindingSlot, DescriptorKind, DeviceObject, Error, PoolSize, SettingsBuilder, ShaderStages, WorkerId};

use framework::{Bindings, Event, MockBuffer, MockTexture};

mod framework;

#[test]
pub fn pool_blocks_grow_geometrically() -> Result<()> {
    let (device, factory) = framework::make_factory(
        SettingsBuilder::new()
            .initial_pool_capacity(2u32)
            .pool_growth_factor(2u32)
            .build(),
    )?;
    let layout = factory.create_layout(&[
        BindingSlot::new(0, DescriptorKind::UniformBuffer, ShaderStages::VERTEX),
        BindingSlot::new(1, DescriptorKind::UniformBuffer, ShaderStages::VERTEX),
        BindingSlot::new(2, DescriptorKind::Image, ShaderStages::FRAGMENT),
    ])?;
    let texture = MockTexture {
        id: 1000,
        mips: 1,
    };
    let buffers = (0..30)
        .map(|id| MockBuffer {
            id,
        })
        .collect::<Vec<_>>();

    for buffer in &buffers {
        let bindings = Bindings::new()
            .bind_uniform_buffer(0, buffer, 0, 16)?
            .bind_uniform_buffer(1, buffer, 16, 16)?
            .bind_image(2, &texture, 0)?;
        factory.create_set(WorkerId(0), &layout, &bindings)?;
    }

    let state = device.state();
    let capacities = state.pools.iter().map(|pool| pool.max_sets).collect::<Vec<_>>();
    assert_eq!(capacities, vec![2, 4, 8, 16]);
    let allocated = state.pools.iter().map(|pool| pool.allocated).collect::<Vec<_>>();
    assert_eq!(allocated, vec![2, 4, 8, 16], "Every block should be filled before the next one is created");

    for pool in &state.pools {
        let mut sizes = pool.sizes.clone();
        sizes.sort_by_key(|size| size.kind);
        assert_eq!(
            sizes,
            vec![
                PoolSize {
                    kind: DescriptorKind::UniformBuffer,
                    count: 2 * pool.max_sets,
                },
                PoolSize {
                    kind: DescriptorKind::Image,
                    count: pool.max_sets,
                },
            ]
        );
    }
    drop(state);

    let stats = factory.stats(&layout)?;
    assert_eq!(stats.sets(), 30);
    assert_eq!(stats.pool_blocks(), 4);
    assert_eq!(stats.allocators[0].last_block_capacity, 16);
    assert_eq!(stats.allocators[0].free_in_last_block, 0);
    Ok(())
}

#[test]
pub fn pool_is_created_on_first_set() -> Result<()> {
    let (device, factory) = framework::make_default_factory()?;
    let layout = factory.create_layout(&[BindingSlot::new(0, DescriptorKind::StorageBuffer, ShaderStages::COMPUTE)])?;
    assert_eq!(device.pools_created(), 0);

    let buffer = MockBuffer {
        id: 1,
    };
    factory.create_set(WorkerId(0), &layout, &Bindings::new().bind_storage_buffer(0, &buffer, 0, 4)?)?;
    assert_eq!(device.pools_created(), 1);
    let stats = factory.stats(&layout)?;
    assert_eq!(stats.allocators[0].last_block_capacity, factory.settings().initial_pool_capacity);
    assert_eq!(stats.allocators[0].free_in_last_block, factory.settings().initial_pool_capacity - 1);
    Ok(())
}

#[test]
pub fn refused_pool_leaves_cache_unchanged() -> Result<()> {
    let (device, factory) = framework::make_default_factory()?;
    let layout = factory.create_layout(&[BindingSlot::new(0, DescriptorKind::UniformBuffer, ShaderStages::ALL)])?;
    let buffer = MockBuffer {
        id: 1,
    };
    let bindings = Bindings::new().bind_uniform_buffer(0, &buffer, 0, 16)?;

    device.fail_pool_creation(true);
    let err = factory
        .create_set(WorkerId(0), &layout, &bindings)
        .expect_err("Device refused the pool");
    assert!(matches!(
        err.downcast_ref::<Error>(),
        Some(Error::DeviceAllocation(DeviceObject::Pool))
    ));
    let stats = factory.stats(&layout)?;
    assert_eq!(stats.sets(), 0);
    assert_eq!(stats.pool_blocks(), 0);
    assert_eq!(device.write_count(), 0);

    // Retrying must not hit a stale cache entry
    device.fail_pool_creation(false);
    let set = factory.create_set(WorkerId(0), &layout, &bindings)?;
    assert_eq!(device.write_count(), 1);
    assert!(device.last_write(set).is_some());
    assert_eq!(factory.stats(&layout)?.sets(), 1);
    Ok(())
}

#[test]
pub fn destroy_releases_pools_before_layouts() -> Result<()> {
    let (device, factory) = framework::make_factory(SettingsBuilder::new().initial_pool_capacity(1u32).build())?;
    let first = factory.create_layout(&[BindingSlot::new(0, DescriptorKind::UniformBuffer, ShaderStages::ALL)])?;
    let second = factory.create_layout(&[BindingSlot::new(0, DescriptorKind::StorageBuffer, ShaderStages::ALL)])?;
    let buffers = (0..4)
        .map(|id| MockBuffer {
            id,
        })
        .collect::<Vec<_>>();
    for (worker, buffer) in buffers.iter().enumerate() {
        let worker = WorkerId(worker as u32 % 2);
        factory.create_set(worker, &first, &Bindings::new().bind_uniform_buffer(0, buffer, 0, 16)?)?;
        factory.create_set(worker, &second, &Bindings::new().bind_storage_buffer(0, buffer, 0, 16)?)?;
    }
    let created = device.pools_created();
    assert!(created >= 4);

    factory.destroy();

    let state = device.state();
    assert!(state.layouts.is_empty(), "Every native layout should be destroyed");
    assert!(state.pools.iter().all(|pool| pool.destroyed), "Every pool block should be destroyed");
    let position = |wanted: Event| state.events.iter().position(|event| *event == wanted);
    for record in state.sets.values() {
        let pool_destroyed = position(Event::DestroyPool(record.pool)).expect("pool destroyed");
        let layout_destroyed = position(Event::DestroyLayout(record.layout)).expect("layout destroyed");
        assert!(pool_destroyed < layout_destroyed, "Pool {} outlived layout {}", record.pool, record.layout);
    }
    assert!(
        state.sets.values().any(|record| record.layout == first.native())
            && state.sets.values().any(|record| record.layout == second.native())
    );
    Ok(())
}

#[test]
pub fn destroy_releases_layouts_still_held_by_caller() -> Result<()> {
    let (device, factory) = framework::make_default_factory()?;
    let handle = factory.create_layout(&[BindingSlot::new(0, DescriptorKind::UniformBuffer, ShaderStages::ALL)])?;
    let buffer = MockBuffer {
        id: 1,
    };
    factory.create_set(WorkerId(0), &handle, &Bindings::new().bind_uniform_buffer(0, &buffer, 0, 16)?)?;
    let held = factory.layout(&handle)?;
    assert!(!held.is_released());

    factory.destroy();

    {
        let state = device.state();
        assert!(state.layouts.is_empty(), "Held layout must not keep its native layout alive");
        assert!(state.pools.iter().all(|pool| pool.destroyed), "Held layout must not keep its pools alive");
    }
    assert!(held.is_released());
    assert_eq!(held.slots().len(), 1, "Released layout still describes its shape");

    // Dropping the last reference must not destroy anything twice
    drop(held);
    let destroyed_layouts = device
        .state()
        .events
        .iter()
        .filter(|event| matches!(event, Event::DestroyLayout(_)))
        .count();
    assert_eq!(destroyed_layouts, 1);
    Ok(())
}
